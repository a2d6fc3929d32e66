use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use folio_types::{ImagePayload, ImageReference};

use crate::{ImageStore, Result, StorageError, check_backend, describe, new_key, verify_digest};

/// Manages on-disk image storage.
///
/// Each image is stored as a single flat file at `{dir}/{key}`.
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    pub const NAME: &'static str = "fs";

    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to the file for a given key. Keys are flat file names; anything
    /// that could escape the storage directory is rejected.
    pub fn file_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    /// List all keys that have files on disk.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl ImageStore for FsImageStore {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn store(&self, image: &ImagePayload) -> Result<ImageReference> {
        let key = new_key(image);
        let path = self.file_path(&key)?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        write_or_remove(&path, file, &image.data).await?;

        debug!("Stored image {} ({} bytes)", key, image.data.len());
        Ok(describe(Self::NAME, key, image))
    }

    async fn retrieve(&self, reference: &ImageReference) -> Result<Bytes> {
        check_backend(Self::NAME, reference)?;
        let path = self.file_path(&reference.id)?;

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(reference.id.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        verify_digest(reference, &data)?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, reference: &ImageReference) -> Result<()> {
        check_backend(Self::NAME, reference)?;
        let path = self.file_path(&reference.id)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted image {}", reference.id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Image {} already gone", reference.id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `data` through `writer`, removing the file at `path` if the write
/// does not complete.
async fn write_or_remove<W: AsyncWrite + Unpin>(path: &Path, mut writer: W, data: &[u8]) -> Result<()> {
    let written: std::io::Result<()> = async {
        writer.write_all(data).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(writer);
        if let Err(remove) = fs::remove_file(path).await {
            warn!("Failed to remove partial image {}: {}", path.display(), remove);
        }
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Writer whose every write fails, as on a full disk.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::other("no space left on device")))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    const JPEG: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0\x01";

    async fn store_in(dir: &tempfile::TempDir) -> FsImageStore {
        FsImageStore::new(dir.path().join("images")).await.unwrap()
    }

    #[tokio::test]
    async fn store_retrieve_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let reference = store.store(&ImagePayload::new(JPEG)).await.unwrap();
        assert_eq!(reference.storage, "fs");
        assert!(reference.id.ends_with(".jpeg"));
        assert_eq!(store.list_keys().await.unwrap(), vec![reference.id.clone()]);

        let data = store.retrieve(&reference).await.unwrap();
        assert_eq!(&data[..], JPEG);

        store.delete(&reference).await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
        assert!(matches!(
            store.retrieve(&reference).await,
            Err(StorageError::NotFound(_))
        ));

        // second delete is fine
        store.delete(&reference).await.unwrap();
    }

    #[tokio::test]
    async fn tampered_file_fails_digest_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let reference = store.store(&ImagePayload::new(JPEG)).await.unwrap();
        fs::write(store.file_path(&reference.id).unwrap(), b"swapped")
            .await
            .unwrap();

        assert!(matches!(
            store.retrieve(&reference).await,
            Err(StorageError::DigestMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        for key in ["", "..", "../etc/passwd", "a/b", "a\\b"] {
            assert!(matches!(
                store.file_path(key),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn refuses_foreign_references() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let mut reference = store.store(&ImagePayload::new(JPEG)).await.unwrap();
        reference.storage = "memory".into();

        assert!(matches!(
            store.retrieve(&reference).await,
            Err(StorageError::WrongBackend { .. })
        ));
        assert!(matches!(
            store.delete(&reference).await,
            Err(StorageError::WrongBackend { .. })
        ));
    }

    #[tokio::test]
    async fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let path = store.file_path("partial.png").unwrap();
        fs::write(&path, b"\x89PN").await.unwrap();

        let result = write_or_remove(&path, FullDisk, JPEG).await;
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(!path.exists());
        assert!(store.list_keys().await.unwrap().is_empty());
    }
}
