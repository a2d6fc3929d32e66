use bytes::Bytes;
use tracing::{debug, info};

use folio_db::models::PhotoRow;
use folio_db::{documents, photos};
use folio_storage::ImageStore;
use folio_types::{ImagePayload, Photo};

use crate::Records;
use crate::error::{Error, Result};
use crate::images::{StagedImages, purge, validate_image};

/// Photo operations. Obtained from [`Records::photos`].
pub struct Photos<'a, S> {
    records: &'a Records<S>,
}

impl<'a, S: ImageStore> Photos<'a, S> {
    pub(crate) fn new(records: &'a Records<S>) -> Self {
        Self { records }
    }

    /// Store `image` and attach it to an existing document.
    pub async fn create(&self, document_id: i64, image: &ImagePayload) -> Result<Photo> {
        validate_image(image, self.records.max_image_bytes)?;

        // Fail before touching the store when the owner is plainly missing.
        // The transaction below checks again.
        let exists = self
            .records
            .db
            .with_conn(|conn| documents::document_exists(conn, document_id))?;
        if !exists {
            return Err(Error::NotFound {
                entity: "document",
                id: document_id,
            });
        }

        let mut staged = StagedImages::new(&self.records.store);
        let result: Result<PhotoRow> = async {
            let image_data = staged.stage(image).await?;
            self.records.db.with_tx(|tx| {
                documents::require_document(tx, document_id)?;
                Ok::<_, Error>(photos::insert_photo(tx, document_id, Some(image_data.as_str()))?)
            })
        }
        .await;
        let row = staged.settle(result).await?;

        info!("Created photo {} for document {}", row.id, document_id);
        Ok(to_photo(row))
    }

    /// Replace the photo's image when one is given. Without an image the
    /// photo is returned as stored.
    pub async fn update(&self, id: i64, image: Option<&ImagePayload>) -> Result<Photo> {
        let Some(image) = image else {
            return self.find(id);
        };
        validate_image(image, self.records.max_image_bytes)?;

        let mut staged = StagedImages::new(&self.records.store);
        let result: Result<(PhotoRow, Option<String>)> = async {
            let image_data = staged.stage(image).await?;
            self.records.db.with_tx(|tx| {
                let current = photos::require_photo(tx, id)?;
                let updated = photos::update_photo_image(tx, &current, Some(image_data.as_str()))?;
                Ok::<_, Error>((updated, current.image_data))
            })
        }
        .await;
        let (row, superseded) = staged.settle(result).await?;

        purge(&self.records.store, superseded).await;
        info!("Replaced image of photo {}", id);
        Ok(to_photo(row))
    }

    /// Delete the photo row, then its stored bytes. Returns the photo as it
    /// was before deletion.
    pub async fn destroy(&self, id: i64) -> Result<Photo> {
        let row = self.records.db.with_tx(|tx| {
            let row = photos::require_photo(tx, id)?;
            photos::delete_photo(tx, id)?;
            Ok::<_, Error>(row)
        })?;

        purge(&self.records.store, row.image_data.clone()).await;
        info!("Destroyed photo {}", id);
        Ok(to_photo(row))
    }

    pub fn find(&self, id: i64) -> Result<Photo> {
        let row = self
            .records
            .db
            .with_conn(|conn| photos::require_photo(conn, id))?;
        Ok(to_photo(row))
    }

    /// Photos of one document in creation order.
    pub fn find_by_document(&self, document_id: i64) -> Result<Vec<Photo>> {
        self.records.db.with_conn(|conn| {
            documents::require_document(conn, document_id)?;
            let rows = photos::list_photos_for_document(conn, document_id)?;
            Ok(rows.into_iter().map(to_photo).collect())
        })
    }

    /// Fetch the stored bytes behind a photo.
    pub async fn image(&self, id: i64) -> Result<Bytes> {
        let photo = self.find(id)?;
        let reference = photo.image().ok_or(Error::NotFound { entity: "image", id })?;
        let data = self.records.store.retrieve(&reference).await?;
        debug!("Loaded {} bytes for photo {}", data.len(), id);
        Ok(data)
    }
}

pub(crate) fn to_photo(row: PhotoRow) -> Photo {
    Photo {
        id: row.id,
        document_id: row.document_id,
        image_data: row.image_data,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
