use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Image I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image {0} not found in storage")]
    NotFound(String),

    #[error("Invalid image key {0:?}")]
    InvalidKey(String),

    #[error("Image {id} lives in storage {storage:?}, not {expected:?}")]
    WrongBackend {
        id: String,
        storage: String,
        expected: String,
    },

    #[error("Image {id} hash mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        id: String,
        expected: String,
        actual: String,
    },
}
