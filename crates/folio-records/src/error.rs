use thiserror::Error;

use folio_db::DbError;
use folio_storage::StorageError;

/// Every operation fails with exactly one of these. Nothing is retried and
/// nothing partially applied survives the failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Database error: {0}")]
    Database(DbError),

    #[error("Image storage error: {0}")]
    ImageStore(#[from] StorageError),

    #[error("Image reference encoding failed: {0}")]
    Reference(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Persistence or image-storage failure, as opposed to bad input or a
    /// missing record.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::ImageStore(_) | Error::Reference(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => Error::NotFound { entity, id },
            DbError::ForeignKey(msg) => Error::Validation(msg),
            other => Error::Database(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
