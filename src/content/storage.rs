use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("object not found")]
    NotFound,
    #[error("invalid digest format")]
    InvalidDigest,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContentStoreError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Content-addressed byte storage: one object per distinct SHA-256 digest,
/// shared by every file row that references it. Objects are immutable and are
/// never removed by draft edits, since published revisions may still point at
/// them.
pub struct ContentStore {
    base_path: PathBuf,
}

impl ContentStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("objects"),
        }
    }

    fn object_path(&self, digest: &str) -> PathBuf {
        let prefix1 = &digest[0..2];
        let prefix2 = &digest[2..4];
        self.base_path.join(prefix1).join(prefix2).join(digest)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    pub async fn exists(&self, digest: &str) -> Result<bool, ContentStoreError> {
        validate_digest(digest)?;
        Ok(self.object_path(digest).exists())
    }

    pub async fn get(&self, digest: &str) -> Result<(BufReader<File>, i64), ContentStoreError> {
        validate_digest(digest)?;
        let path = self.object_path(digest);
        let file = File::open(&path).await.map_err(ContentStoreError::from_io)?;

        let metadata = file.metadata().await?;
        let size = metadata.len() as i64;

        Ok((BufReader::new(file), size))
    }

    /// Stores `data` and returns its digest. Identical bytes land on the same
    /// path, so a repeat put is a cheap no-op.
    pub async fn put(&self, data: &[u8]) -> Result<String, ContentStoreError> {
        let digest = sha256_hex(data);

        let final_path = self.object_path(&digest);
        if final_path.exists() {
            return Ok(digest);
        }

        // Write-then-rename keeps a concurrent reader from ever observing a
        // partial object.
        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&temp_path, &final_path).await?;

        Ok(digest)
    }
}

#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn validate_digest(digest: &str) -> Result<(), ContentStoreError> {
    if digest.len() != 64 {
        return Err(ContentStoreError::InvalidDigest);
    }

    if !digest
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_uppercase())
    {
        return Err(ContentStoreError::InvalidDigest);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ContentStore::new(temp_dir.path());

        let data = b"123";
        let digest = storage.put(data).await.unwrap();
        assert_eq!(
            digest,
            "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3"
        );

        assert!(storage.exists(&digest).await.unwrap());

        let (mut reader, size) = storage.get(&digest).await.unwrap();
        assert_eq!(size, data.len() as i64);

        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, data);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ContentStore::new(temp_dir.path());

        let first = storage.put(b"same bytes").await.unwrap();
        let second = storage.put(b"same bytes").await.unwrap();
        assert_eq!(first, second);

        let (_, size) = storage.get(&first).await.unwrap();
        assert_eq!(size, 10);
    }

    #[tokio::test]
    async fn test_invalid_digest() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ContentStore::new(temp_dir.path());

        assert!(matches!(
            storage.exists("invalid").await,
            Err(ContentStoreError::InvalidDigest)
        ));

        assert!(matches!(
            storage
                .get("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
                .await,
            Err(ContentStoreError::InvalidDigest)
        ));
    }

    #[tokio::test]
    async fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ContentStore::new(temp_dir.path());

        let missing = sha256_hex(b"never stored");
        assert!(!storage.exists(&missing).await.unwrap());
        assert!(matches!(
            storage.get(&missing).await,
            Err(ContentStoreError::NotFound)
        ));
    }
}
