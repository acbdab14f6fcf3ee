//! Directory-backed blob store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{BlobObject, LOCAL_MEDIA_PREFIX, StorageError};

/// Blob store keeping every blob as a file under a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL of a blob.
    #[must_use]
    pub fn public_url(path: &str) -> String {
        format!("{LOCAL_MEDIA_PREFIX}/{path}")
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/').fold(self.root.clone(), |acc, part| acc.join(part))
    }

    pub(super) async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.resolve(path)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub(super) async fn put(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write next to the target and rename so readers never see a partial file.
        let tmp = target.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %target.display(), "Blob written");
        Ok(Self::public_url(path))
    }

    pub(super) async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>, StorageError> {
        let mut objects = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                    continue;
                }

                let Some(pathname) = self.relative_path(&entry.path()) else {
                    continue;
                };
                if !pathname.starts_with(prefix) || pathname.contains(".tmp-") {
                    continue;
                }

                let metadata = entry.metadata().await?;
                objects.push(BlobObject {
                    url: Self::public_url(&pathname),
                    pathname,
                    size: metadata.len(),
                    uploaded_at: metadata.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }

        objects.sort_by(|a, b| a.pathname.cmp(&b.pathname));
        Ok(objects)
    }

    pub(super) async fn ping(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative.iter().map(|p| p.to_str()).collect();
        Some(parts?.join("/"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::storage::BlobStore;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::Local(LocalBlobStore::new(dir.path().to_path_buf()));

        let url = store
            .put("clean-data/news.json", b"[]".to_vec(), "application/json")
            .await
            .unwrap();
        assert_eq!(url, "/media/clean-data/news.json");

        let bytes = store.get("clean-data/news.json").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"[]"[..]));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::Local(LocalBlobStore::new(dir.path().to_path_buf()));
        assert!(store.get("clean-data/about.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::Local(LocalBlobStore::new(dir.path().to_path_buf()));
        store.put("a/b.txt", b"one".to_vec(), "text/plain").await.unwrap();
        store.put("a/b.txt", b"two".to_vec(), "text/plain").await.unwrap();
        assert_eq!(store.get("a/b.txt").await.unwrap().unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::Local(LocalBlobStore::new(dir.path().to_path_buf()));
        store.put("clean-data/news.json", b"[]".to_vec(), "application/json").await.unwrap();
        store.put("clean-data/html/imprint.html", b"<p>x</p>".to_vec(), "text/html").await.unwrap();
        store.put("images/general/x.png", b"png".to_vec(), "image/png").await.unwrap();

        let listed = store.list("clean-data/").await.unwrap();
        let paths: Vec<_> = listed.iter().map(|o| o.pathname.as_str()).collect();
        assert_eq!(paths, ["clean-data/html/imprint.html", "clean-data/news.json"]);
        assert_eq!(listed[1].size, 2);
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::Local(LocalBlobStore::new(dir.path().to_path_buf()));
        let result = store.put("../escape.txt", b"x".to_vec(), "text/plain").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }
}
