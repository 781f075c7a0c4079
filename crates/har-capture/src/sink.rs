//! Persistence boundary for flushed batches.
//!
//! The buffer hands each batch document to a `Sink` fire-and-forget:
//! completion is never awaited by the capture path and failures are
//! logged, not retried — by the time the write runs, the batch is
//! already gone from memory.

use crate::config::NameResolver;
use crate::har::HarDocument;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

/// Result type for sink operations.
pub type SinkResult = Result<(), SinkError>;

/// Errors that can occur while persisting a batch.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The document could not be encoded. Fatal for that flush only;
    /// the batch is dropped.
    #[error("failed to encode capture batch: {0}")]
    Encode(#[from] serde_json::Error),

    /// The document could not be written.
    #[error("failed to write capture batch: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for flushed batch documents.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Resolve a destination name and persist the document.
    async fn persist(&self, document: HarDocument) -> SinkResult;
}

#[async_trait]
impl<T> Sink for std::sync::Arc<T>
where
    T: Sink + ?Sized,
{
    async fn persist(&self, document: HarDocument) -> SinkResult {
        (**self).persist(document).await
    }
}

/// File-based sink writing one `.har` file per batch.
///
/// Files are named `<unix-millis>[-<suffix>].har`, where the optional
/// suffix comes from the configured name resolver applied to the
/// assembled document.
pub struct FileSink {
    output_dir: PathBuf,
    name_resolver: Option<NameResolver>,
}

impl FileSink {
    /// Create a sink writing into the given directory.
    pub fn new(output_dir: impl Into<PathBuf>, name_resolver: Option<NameResolver>) -> Self {
        Self {
            output_dir: output_dir.into(),
            name_resolver,
        }
    }

    fn file_name(&self, document: &HarDocument) -> String {
        let mut name = chrono::Utc::now().timestamp_millis().to_string();
        if let Some(resolver) = &self.name_resolver {
            if let Some(suffix) = resolver(document) {
                name.push('-');
                name.push_str(&suffix);
            }
        }
        name.push_str(".har");
        name
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn persist(&self, document: HarDocument) -> SinkResult {
        let encoded = serde_json::to_vec(&document)?;
        let path = self.output_dir.join(self.file_name(&document));
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&path, encoded).await?;
        tracing::debug!(path = %path.display(), entries = document.log.entries.len(), "wrote capture batch");
        Ok(())
    }
}

/// In-memory sink retaining every flushed document.
///
/// Useful in tests and for embedders that want in-process access to
/// batches instead of files.
#[derive(Default)]
pub struct MemorySink {
    documents: Mutex<Vec<HarDocument>>,
}

impl MemorySink {
    /// Create an empty in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents persisted so far, oldest first.
    pub fn documents(&self) -> Vec<HarDocument> {
        match self.documents.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of documents persisted so far.
    pub fn len(&self) -> usize {
        match self.documents.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether nothing has been persisted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn persist(&self, document: HarDocument) -> SinkResult {
        let mut documents = match self.documents.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        documents.push(document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_sink_writes_har_file() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path(), None);

        sink.persist(HarDocument::new(Vec::new())).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".har"));

        let data = std::fs::read(dir.path().join(&files[0])).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(parsed["log"]["version"], "1.1");
    }

    #[tokio::test]
    async fn test_file_sink_applies_name_suffix() {
        let dir = TempDir::new().unwrap();
        let resolver: NameResolver = Arc::new(|_doc| Some("checkout".to_string()));
        let sink = FileSink::new(dir.path(), Some(resolver));

        sink.persist(HarDocument::new(Vec::new())).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert!(files[0].ends_with("-checkout.har"), "got {}", files[0]);
    }

    #[tokio::test]
    async fn test_file_sink_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("har");
        let sink = FileSink::new(&nested, None);

        sink.persist(HarDocument::new(Vec::new())).await.unwrap();

        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_memory_sink_retains_documents() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.persist(HarDocument::new(Vec::new())).await.unwrap();
        sink.persist(HarDocument::new(Vec::new())).await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.documents().len(), 2);
    }
}
