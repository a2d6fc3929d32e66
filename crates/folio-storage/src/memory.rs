use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;

use folio_types::{ImagePayload, ImageReference};

use crate::{ImageStore, Result, StorageError, check_backend, describe, new_key, verify_digest};

/// Keeps images in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryImageStore {
    images: Mutex<HashMap<String, Bytes>>,
}

impl MemoryImageStore {
    pub const NAME: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.images.lock().map(|images| images.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, reference: &ImageReference) -> bool {
        self.images
            .lock()
            .map(|images| images.contains_key(&reference.id))
            .unwrap_or(false)
    }

    fn with_images<T>(&self, f: impl FnOnce(&mut HashMap<String, Bytes>) -> T) -> Result<T> {
        let mut images = self
            .images
            .lock()
            .map_err(|e| std::io::Error::other(format!("Image map lock poisoned: {}", e)))?;
        Ok(f(&mut images))
    }
}

impl ImageStore for MemoryImageStore {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn store(&self, image: &ImagePayload) -> Result<ImageReference> {
        let key = new_key(image);
        self.with_images(|images| images.insert(key.clone(), image.data.clone()))?;
        Ok(describe(Self::NAME, key, image))
    }

    async fn retrieve(&self, reference: &ImageReference) -> Result<Bytes> {
        check_backend(Self::NAME, reference)?;
        let data = self
            .with_images(|images| images.get(&reference.id).cloned())?
            .ok_or_else(|| StorageError::NotFound(reference.id.clone()))?;
        verify_digest(reference, &data)?;
        Ok(data)
    }

    async fn delete(&self, reference: &ImageReference) -> Result<()> {
        check_backend(Self::NAME, reference)?;
        self.with_images(|images| images.remove(&reference.id))?;
        Ok(())
    }
}
