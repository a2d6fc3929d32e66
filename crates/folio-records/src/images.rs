use tracing::{debug, warn};

use folio_storage::ImageStore;
use folio_types::{ImagePayload, ImageReference};

use crate::error::{Error, Result};

/// 50 MB upload limit for images
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

pub(crate) fn validate_image(image: &ImagePayload, max_bytes: usize) -> Result<()> {
    if image.data.is_empty() {
        return Err(Error::validation("image is empty"));
    }
    if image.data.len() > max_bytes {
        return Err(Error::validation(format!(
            "image is {} bytes, limit is {}",
            image.data.len(),
            max_bytes
        )));
    }
    Ok(())
}

/// Images written to the store while an operation is in flight.
///
/// Bytes are stored before the database transaction opens. If the
/// operation then fails, [`StagedImages::settle`] removes them again so a
/// failed operation leaves neither rows nor bytes behind.
pub(crate) struct StagedImages<'a, S> {
    store: &'a S,
    references: Vec<ImageReference>,
}

impl<'a, S: ImageStore> StagedImages<'a, S> {
    pub(crate) fn new(store: &'a S) -> Self {
        Self {
            store,
            references: Vec::new(),
        }
    }

    /// Store `image` and return the value for `photos.image_data`.
    pub(crate) async fn stage(&mut self, image: &ImagePayload) -> Result<String> {
        let reference = self.store.store(image).await?;
        let encoded = reference.encode();
        self.references.push(reference);
        Ok(encoded?)
    }

    /// Pass `result` through, discarding staged bytes if it is an error.
    pub(crate) async fn settle<T>(self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            for reference in &self.references {
                if let Err(e) = self.store.delete(reference).await {
                    warn!("Failed to discard staged image {}: {}", reference.id, e);
                }
            }
            debug!("Discarded {} staged images", self.references.len());
        }
        result
    }
}

/// Delete bytes whose rows are gone or now point elsewhere. Best effort:
/// the rows are already committed, so failures are only logged.
pub(crate) async fn purge<S: ImageStore>(store: &S, image_data: impl IntoIterator<Item = String>) {
    for raw in image_data {
        let reference = match ImageReference::decode(&raw) {
            Ok(reference) => reference,
            Err(e) => {
                warn!("Skipping unreadable image reference {:?}: {}", raw, e);
                continue;
            }
        };
        if reference.storage != store.name() {
            warn!(
                "Skipping image {} held by storage {:?}",
                reference.id, reference.storage
            );
            continue;
        }
        if let Err(e) = store.delete(&reference).await {
            warn!("Failed to delete image {}: {}", reference.id, e);
        }
    }
}
