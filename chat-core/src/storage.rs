//! Whole-document JSON storage.
//!
//! Each store is one JSON document that is read in full, mutated in memory and
//! written back in full. A [`JsonDocument`] serialises every such cycle behind a
//! single async lock, so concurrent writers queue up instead of clobbering each
//! other. There is no journal: a crash in the middle of a write can leave a
//! truncated file behind.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing;

use crate::error::{StoreError, StoreResult};

/// Raw byte storage underneath a [`JsonDocument`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Location used in logs and error messages.
    fn location(&self) -> &Path;

    /// Full contents, or `None` when nothing has been persisted yet.
    async fn load(&self) -> StoreResult<Option<Vec<u8>>>;

    /// Replace the full contents.
    async fn store(&self, bytes: Vec<u8>) -> StoreResult<()>;
}

/// A JSON file on local disk.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn location(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    async fn store(&self, bytes: Vec<u8>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| StoreError::Io {
                path: self.path.clone(),
                source: e,
            })
    }
}

/// Process-local storage, used for tests and throwaway instances.
pub struct MemoryBackend {
    label: PathBuf,
    contents: Mutex<Option<Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new(label: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            contents: Mutex::new(None),
        }
    }

    /// Backend that starts out holding `bytes`, as if a file already existed.
    pub fn with_contents(label: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            contents: Mutex::new(Some(bytes.into())),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn location(&self) -> &Path {
        &self.label
    }

    async fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.contents.lock().await.clone())
    }

    async fn store(&self, bytes: Vec<u8>) -> StoreResult<()> {
        *self.contents.lock().await = Some(bytes);
        Ok(())
    }
}

/// A typed JSON document guarded by a single writer lock.
pub struct JsonDocument<T> {
    backend: Box<dyn StorageBackend>,
    lock: Mutex<()>,
    _document: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            lock: Mutex::new(()),
            _document: PhantomData,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(path))
    }

    pub fn in_memory(label: impl Into<PathBuf>) -> Self {
        Self::new(MemoryBackend::new(label))
    }

    pub fn location(&self) -> &Path {
        self.backend.location()
    }

    /// Current contents; a document that was never written reads as `T::default()`.
    pub async fn read(&self) -> StoreResult<T> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.unwrap_or_default())
    }

    /// Read-modify-write, starting from `T::default()` when the document is absent.
    ///
    /// `mutate` returns its outcome together with whether it changed anything;
    /// the document is written back only in that case.
    pub async fn update<R, F>(&self, mutate: F) -> StoreResult<R>
    where
        F: FnOnce(&mut T) -> (R, bool),
    {
        let _guard = self.lock.lock().await;

        let mut document = self.load().await?.unwrap_or_default();
        let (outcome, changed) = mutate(&mut document);
        if changed {
            self.save(&document).await?;
        }

        Ok(outcome)
    }

    /// Like [`JsonDocument::update`], but a missing document is left missing and
    /// yields `R::default()` without calling `mutate`.
    pub async fn update_existing<R, F>(&self, mutate: F) -> StoreResult<R>
    where
        R: Default,
        F: FnOnce(&mut T) -> (R, bool),
    {
        let _guard = self.lock.lock().await;

        let Some(mut document) = self.load().await? else {
            tracing::debug!("{} does not exist yet, nothing to update", self.location().display());
            return Ok(R::default());
        };

        let (outcome, changed) = mutate(&mut document);
        if changed {
            self.save(&document).await?;
        }

        Ok(outcome)
    }

    async fn load(&self) -> StoreResult<Option<T>> {
        let Some(bytes) = self.backend.load().await? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                path: self.location().to_path_buf(),
                source: e,
            })
    }

    async fn save(&self, document: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|e| StoreError::Malformed {
            path: self.location().to_path_buf(),
            source: e,
        })?;

        self.backend.store(bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Counter {
        #[serde(default)]
        values: Vec<u32>,
    }

    #[tokio::test]
    async fn test_missing_document_reads_as_default() {
        let doc: JsonDocument<Counter> = JsonDocument::in_memory("memory:counter");
        let counter = doc.read().await.unwrap();
        assert!(counter.values.is_empty());
    }

    #[tokio::test]
    async fn test_update_existing_does_not_create_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");
        let doc: JsonDocument<Counter> = JsonDocument::file(&path);

        let touched: bool = doc
            .update_existing(|counter| {
                counter.values.push(1);
                (true, true)
            })
            .await
            .unwrap();

        assert!(!touched);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_update_writes_pretty_json_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("counter.json");
        let doc: JsonDocument<Counter> = JsonDocument::file(&path);

        doc.update(|counter| {
            counter.values.push(7);
            ((), true)
        })
        .await
        .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"values\""));
        assert_eq!(doc.read().await.unwrap().values, vec![7]);
    }

    #[tokio::test]
    async fn test_unchanged_update_leaves_document_absent() {
        let backend = MemoryBackend::new("memory:counter");
        let doc: JsonDocument<Counter> = JsonDocument::new(backend);

        let len = doc.update(|counter| (counter.values.len(), false)).await.unwrap();

        assert_eq!(len, 0);
        assert!(doc.backend.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_reported_as_malformed() {
        let doc: JsonDocument<Counter> =
            JsonDocument::new(MemoryBackend::with_contents("memory:broken", "{not json"));

        let err = doc.read().await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        assert!(err.to_string().contains("memory:broken"));
    }

    #[tokio::test]
    async fn test_unreadable_path_is_reported_as_io() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let doc: JsonDocument<Counter> = JsonDocument::file(dir.path());

        let err = doc.read().await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let doc = std::sync::Arc::new(JsonDocument::<Counter>::in_memory("memory:counter"));

        let mut handles = Vec::new();
        for i in 0..32 {
            let doc = doc.clone();
            handles.push(tokio::spawn(async move {
                doc.update(|counter| {
                    counter.values.push(i);
                    ((), true)
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(doc.read().await.unwrap().values.len(), 32);
    }
}
