//! Image storage collaborators.
//!
//! Photos never hold image bytes. An [`ImageStore`] keeps the bytes and
//! hands back an [`ImageReference`] that the database persists instead.

pub mod error;
pub mod fs;
pub mod memory;
pub mod mime;

use std::future::Future;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use folio_types::{ImageMetadata, ImagePayload, ImageReference};

pub use error::StorageError;
pub use fs::FsImageStore;
pub use memory::MemoryImageStore;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Pluggable home for image bytes.
pub trait ImageStore: Send + Sync {
    /// Backend name written into every reference this store produces.
    fn name(&self) -> &str;

    fn store(&self, image: &ImagePayload) -> impl Future<Output = Result<ImageReference>> + Send;

    fn retrieve(&self, reference: &ImageReference) -> impl Future<Output = Result<Bytes>> + Send;

    /// Remove the bytes behind `reference`. Deleting something that is
    /// already gone succeeds.
    fn delete(&self, reference: &ImageReference) -> impl Future<Output = Result<()>> + Send;
}

/// Build the reference for `image` stored under `id` in backend `storage`.
pub fn describe(storage: &str, id: String, image: &ImagePayload) -> ImageReference {
    ImageReference {
        id,
        storage: storage.to_string(),
        metadata: ImageMetadata {
            size: image.data.len() as u64,
            filename: image.filename.clone(),
            mime_type: mime::detect(image).map(str::to_string),
            sha256: sha256_hex(&image.data),
        },
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fresh storage key: a random UUID plus an extension when the MIME type
/// is known.
pub(crate) fn new_key(image: &ImagePayload) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    match mime::detect(image).and_then(mime::extension) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id,
    }
}

pub(crate) fn check_backend(store: &str, reference: &ImageReference) -> Result<()> {
    if reference.storage != store {
        return Err(StorageError::WrongBackend {
            id: reference.id.clone(),
            storage: reference.storage.clone(),
            expected: store.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn verify_digest(reference: &ImageReference, data: &[u8]) -> Result<()> {
    let actual = sha256_hex(data);
    if actual != reference.metadata.sha256 {
        return Err(StorageError::DigestMismatch {
            id: reference.id.clone(),
            expected: reference.metadata.sha256.clone(),
            actual,
        });
    }
    Ok(())
}
