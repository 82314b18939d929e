use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use uuid::Uuid;

use bragger_common::{define_module_client, ModuleClient};

define_module_client! {
    (struct StorageClient, "storage")
    client_type: PathBuf,
    env: [],
    setup: async {
        let root = PathBuf::from(
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
        );
        tokio::fs::create_dir_all(&root).await
            .unwrap_or_else(|e| panic!("Failed to create upload directory {:?}: {:?}", root, e));
        root
    }
}

/// A file written into the upload directory.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
}

impl StorageClient {
    fn root(&self) -> &Path {
        self.get_client()
    }

    /// Derives a fresh `{uuid}.{ext}` key from the original filename.
    pub fn derive_filename(original_name: &str) -> Result<String> {
        let file_ext = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_string();

        if file_ext.is_empty() {
            return Err(anyhow!("Invalid filename: no file extension found"));
        }

        Ok(format!("{}.{}", Uuid::new_v4(), file_ext))
    }

    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<StoredImage> {
        let filename = Self::derive_filename(original_name)?;
        let path = self.root().join(&filename);
        tokio::fs::write(&path, data).await?;
        Ok(StoredImage {
            filename,
            file_path: path.to_string_lossy().into_owned(),
            file_size: data.len() as i64,
        })
    }

    pub async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(filename) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Deleting a file that is already gone is not an error.
    pub async fn remove(&self, filename: &str) -> Result<()> {
        let Some(path) = self.resolve(filename) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Rejects names that could escape the upload directory.
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return None;
        }
        Some(self.root().join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn client_at(root: PathBuf) -> StorageClient {
        StorageClient {
            client: Some(Arc::new(root)),
        }
    }

    #[test]
    fn derived_filenames_keep_the_extension() {
        let name = StorageClient::derive_filename("screenshot.PNG").unwrap();
        assert!(name.ends_with(".PNG"));
        assert_ne!(
            StorageClient::derive_filename("a.png").unwrap(),
            StorageClient::derive_filename("a.png").unwrap()
        );
        assert!(StorageClient::derive_filename("no-extension").is_err());
    }

    #[tokio::test]
    async fn store_read_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = client_at(dir.path().to_path_buf());

        let stored = storage.store("photo.png", b"not-actually-a-png").await.unwrap();
        assert_eq!(stored.file_size, 18);

        let bytes = storage.read(&stored.filename).await.unwrap().unwrap();
        assert_eq!(bytes, b"not-actually-a-png");

        storage.remove(&stored.filename).await.unwrap();
        assert!(storage.read(&stored.filename).await.unwrap().is_none());
        // Removing twice is fine.
        storage.remove(&stored.filename).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_names_never_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let storage = client_at(dir.path().to_path_buf());

        assert!(storage.read("../etc/passwd").await.unwrap().is_none());
        assert!(storage.read("a/b.png").await.unwrap().is_none());
        assert!(storage.read("..").await.unwrap().is_none());
        assert!(storage.read("").await.unwrap().is_none());
    }
}
