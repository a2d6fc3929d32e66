use std::path::PathBuf;

use thiserror::Error;

use crate::images::DEFAULT_MAX_IMAGE_BYTES;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Runtime settings, read from `FOLIO_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub max_image_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "folio.db".into(),
            storage_dir: "./uploads".into(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_image_bytes = match lookup("FOLIO_MAX_IMAGE_BYTES") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "FOLIO_MAX_IMAGE_BYTES",
                        value,
                    });
                }
            },
            None => defaults.max_image_bytes,
        };

        Ok(Self {
            db_path: lookup("FOLIO_DB_PATH").map_or(defaults.db_path, PathBuf::from),
            storage_dir: lookup("FOLIO_STORAGE_DIR").map_or(defaults.storage_dir, PathBuf::from),
            max_image_bytes,
        })
    }
}
