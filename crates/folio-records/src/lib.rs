//! Documents and their photos.
//!
//! [`Records`] ties a [`Database`] to an [`ImageStore`]. Document and photo
//! operations are reached through [`Records::documents`] and
//! [`Records::photos`]; every write that spans several rows runs in one
//! database transaction, and image bytes written for a failed operation are
//! removed again.

pub mod config;
pub mod documents;
pub mod error;
pub mod images;
mod nested;
pub mod photos;

use folio_db::Database;
use folio_storage::{FsImageStore, ImageStore};

pub use config::{Config, ConfigError};
pub use documents::{Documents, PhotoLoading};
pub use error::{Error, Result};
pub use photos::Photos;

pub struct Records<S> {
    db: Database,
    store: S,
    max_image_bytes: usize,
}

impl<S: ImageStore> Records<S> {
    pub fn new(db: Database, store: S) -> Self {
        Self {
            db,
            store,
            max_image_bytes: images::DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn documents(&self) -> Documents<'_, S> {
        Documents::new(self)
    }

    pub fn photos(&self) -> Photos<'_, S> {
        Photos::new(self)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl Records<FsImageStore> {
    /// Open the database (applying migrations) and the on-disk image store
    /// named by `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        let db = Database::open(&config.db_path)?;
        let store = FsImageStore::new(config.storage_dir.clone()).await?;
        Ok(Self::new(db, store).with_max_image_bytes(config.max_image_bytes))
    }
}
