use std::collections::HashMap;

use rusqlite::Connection;
use tracing::info;

use folio_db::models::DocumentRow;
use folio_db::{documents, photos};
use folio_storage::ImageStore;
use folio_types::{CreateDocumentRequest, Document, Photo, UpdateDocumentRequest};

use crate::Records;
use crate::error::{Error, Result};
use crate::images::{StagedImages, purge};
use crate::nested::{self, Mode};
use crate::photos::to_photo;

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

/// Whether a read should also fetch each document's photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoLoading {
    Eager,
    Lazy,
}

/// Document operations. Obtained from [`Records::documents`].
pub struct Documents<'a, S> {
    records: &'a Records<S>,
}

impl<'a, S: ImageStore> Documents<'a, S> {
    pub(crate) fn new(records: &'a Records<S>) -> Self {
        Self { records }
    }

    /// Create a document together with the photos listed in the request.
    pub async fn create(&self, request: &CreateDocumentRequest) -> Result<Document> {
        validate_title(request.title.as_deref())?;
        let planned = nested::plan(&request.photos, Mode::Create, self.records.max_image_bytes)?;

        let mut staged = StagedImages::new(&self.records.store);
        let result: Result<Document> = async {
            let ops = nested::stage(&mut staged, planned).await?;
            self.records.db.with_tx(|tx| {
                let id = documents::insert_document(
                    tx,
                    request.title.as_deref(),
                    request.body.as_deref(),
                )?;
                nested::apply(tx, id, &ops)?;
                load(tx, id, PhotoLoading::Eager)
            })
        }
        .await;
        let document = staged.settle(result).await?;

        info!(
            "Created document {} with {} photos",
            document.id,
            document.photos.as_ref().map_or(0, Vec::len)
        );
        Ok(document)
    }

    /// Apply field changes and nested photo entries as one unit.
    ///
    /// Fields left out of the request keep their values. Without
    /// `photos_attributes` the document's photos are not touched.
    pub async fn update(&self, id: i64, request: &UpdateDocumentRequest) -> Result<Document> {
        validate_title(request.title.as_ref().and_then(Option::as_deref))?;
        let entries = request.photos.as_deref().unwrap_or_default();
        let planned = nested::plan(entries, Mode::Update, self.records.max_image_bytes)?;

        let mut staged = StagedImages::new(&self.records.store);
        let result: Result<(Document, Vec<String>)> = async {
            let ops = nested::stage(&mut staged, planned).await?;
            self.records.db.with_tx(|tx| {
                let current = documents::require_document(tx, id)?;
                if request.changes_fields() {
                    let title = request.title.as_ref().map_or(current.title.as_deref(), Option::as_deref);
                    let body = request.body.as_ref().map_or(current.body.as_deref(), Option::as_deref);
                    documents::update_document(tx, &current, title, body)?;
                }
                let superseded = nested::apply(tx, id, &ops)?;
                Ok::<_, Error>((load(tx, id, PhotoLoading::Eager)?, superseded))
            })
        }
        .await;
        let (document, superseded) = staged.settle(result).await?;

        purge(&self.records.store, superseded).await;
        info!("Updated document {}", id);
        Ok(document)
    }

    /// Delete the document and every photo it owns, then drop the photos'
    /// stored bytes. Returns the document as it was before deletion.
    pub async fn destroy(&self, id: i64) -> Result<Document> {
        let document = self.records.db.with_tx(|tx| {
            let document = load(tx, id, PhotoLoading::Eager)?;
            photos::delete_photos_for_document(tx, id)?;
            documents::delete_document(tx, id)?;
            Ok::<_, Error>(document)
        })?;

        let removed = document.photos.as_deref().unwrap_or_default();
        purge(
            &self.records.store,
            removed.iter().filter_map(|photo| photo.image_data.clone()),
        )
        .await;

        info!("Destroyed document {} and {} photos", id, removed.len());
        Ok(document)
    }

    pub fn find(&self, id: i64, loading: PhotoLoading) -> Result<Document> {
        self.records.db.with_conn(|conn| load(conn, id, loading))
    }

    /// All documents in creation order.
    pub fn list(&self, loading: PhotoLoading) -> Result<Vec<Document>> {
        self.records.db.with_conn(|conn| {
            let rows = documents::list_documents(conn)?;
            if loading == PhotoLoading::Lazy {
                return Ok(rows.into_iter().map(|row| to_document(row, None)).collect());
            }

            // One query for all photos instead of one per document
            let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
            let mut by_document: HashMap<i64, Vec<Photo>> = HashMap::new();
            for photo in photos::list_photos_for_documents(conn, &ids)? {
                if let Some(document_id) = photo.document_id {
                    by_document
                        .entry(document_id)
                        .or_default()
                        .push(to_photo(photo));
                }
            }

            Ok(rows
                .into_iter()
                .map(|row| {
                    let photos = by_document.remove(&row.id).unwrap_or_default();
                    to_document(row, Some(photos))
                })
                .collect())
        })
    }
}

fn validate_title(title: Option<&str>) -> Result<()> {
    match title {
        Some(title) if title.chars().count() > MAX_TITLE_CHARS => Err(Error::validation(format!(
            "title is longer than {} characters",
            MAX_TITLE_CHARS
        ))),
        _ => Ok(()),
    }
}

fn load(conn: &Connection, id: i64, loading: PhotoLoading) -> Result<Document> {
    let row = documents::require_document(conn, id)?;
    let photos = match loading {
        PhotoLoading::Eager => Some(
            photos::list_photos_for_document(conn, id)?
                .into_iter()
                .map(to_photo)
                .collect(),
        ),
        PhotoLoading::Lazy => None,
    };
    Ok(to_document(row, photos))
}

fn to_document(row: DocumentRow, photos: Option<Vec<Photo>>) -> Document {
    Document {
        id: row.id,
        title: row.title,
        body: row.body,
        created_at: row.created_at,
        updated_at: row.updated_at,
        photos,
    }
}
