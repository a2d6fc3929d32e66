//! Nested photo payloads.
//!
//! A document create or update may carry a list of photo entries. They are
//! handled in three explicit steps: [`plan`] checks the shape of every
//! entry, [`stage`] stores new image bytes, and [`apply`] runs inside the
//! document's transaction and writes the photo rows.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::debug;

use folio_db::photos;
use folio_storage::ImageStore;
use folio_types::{ImagePayload, NestedPhoto};

use crate::error::{Error, Result};
use crate::images::{StagedImages, validate_image};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// The document does not exist yet, so entries may only add photos.
    Create,
    Update,
}

#[derive(Debug)]
pub(crate) enum Planned<'a> {
    Create { image: &'a ImagePayload },
    Update { id: i64, image: Option<&'a ImagePayload> },
    Destroy { id: i64 },
}

#[derive(Debug)]
pub(crate) enum Staged {
    Create { image_data: String },
    Update { id: i64, image_data: Option<String> },
    Destroy { id: i64 },
}

pub(crate) fn plan(entries: &[NestedPhoto], mode: Mode, max_image_bytes: usize) -> Result<Vec<Planned<'_>>> {
    let mut seen = HashSet::new();
    let mut planned = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let op = match (entry.id, entry.destroy) {
            (None, true) => {
                return Err(Error::validation(format!(
                    "photo entry {} is marked for removal but has no id",
                    index
                )));
            }
            (None, false) => {
                let image = entry.image.as_ref().ok_or_else(|| {
                    Error::validation(format!("photo entry {} has neither id nor image", index))
                })?;
                Planned::Create { image }
            }
            (Some(id), _) if mode == Mode::Create => {
                return Err(Error::validation(format!(
                    "photo entry {} references photo {} on a new document",
                    index, id
                )));
            }
            (Some(id), true) => Planned::Destroy { id },
            (Some(id), false) => Planned::Update {
                id,
                image: entry.image.as_ref(),
            },
        };

        if let Planned::Update { id, .. } | Planned::Destroy { id } = op {
            if !seen.insert(id) {
                return Err(Error::validation(format!(
                    "photo {} appears more than once",
                    id
                )));
            }
        }
        if let Planned::Create { image } | Planned::Update { image: Some(image), .. } = op {
            validate_image(image, max_image_bytes)?;
        }

        planned.push(op);
    }

    Ok(planned)
}

pub(crate) async fn stage<S: ImageStore>(
    staged: &mut StagedImages<'_, S>,
    planned: Vec<Planned<'_>>,
) -> Result<Vec<Staged>> {
    let mut ops = Vec::with_capacity(planned.len());
    for op in planned {
        ops.push(match op {
            Planned::Create { image } => Staged::Create {
                image_data: staged.stage(image).await?,
            },
            Planned::Update { id, image: Some(image) } => Staged::Update {
                id,
                image_data: Some(staged.stage(image).await?),
            },
            Planned::Update { id, image: None } => Staged::Update {
                id,
                image_data: None,
            },
            Planned::Destroy { id } => Staged::Destroy { id },
        });
    }
    Ok(ops)
}

/// Write the photo rows for `document_id`. Must run inside the document's
/// transaction. Returns the image references that are no longer used so the
/// caller can purge them after commit.
pub(crate) fn apply(conn: &Connection, document_id: i64, ops: &[Staged]) -> Result<Vec<String>> {
    let mut superseded = Vec::new();

    for op in ops {
        match op {
            Staged::Create { image_data } => {
                photos::insert_photo(conn, document_id, Some(image_data.as_str()))?;
            }
            Staged::Update { id, image_data } => {
                let current = owned_photo(conn, document_id, *id)?;
                if let Some(image_data) = image_data {
                    photos::update_photo_image(conn, &current, Some(image_data.as_str()))?;
                    superseded.extend(current.image_data);
                }
            }
            Staged::Destroy { id } => {
                let current = owned_photo(conn, document_id, *id)?;
                photos::delete_photo(conn, *id)?;
                superseded.extend(current.image_data);
            }
        }
    }

    debug!(
        "Applied {} nested photo entries to document {}",
        ops.len(),
        document_id
    );
    Ok(superseded)
}

/// A nested entry may only touch photos of the document being saved.
fn owned_photo(conn: &Connection, document_id: i64, id: i64) -> Result<folio_db::models::PhotoRow> {
    match photos::get_photo(conn, id)? {
        Some(row) if row.document_id == Some(document_id) => Ok(row),
        _ => Err(Error::NotFound { entity: "photo", id }),
    }
}
