//! Document archive backed by an object store.
//!
//! Documents live under the `ScrapedBooks/` prefix as `<name>.pdf`. The
//! [`DocumentStore`] trait is the seam the transfer strategies talk to;
//! [`ObjectStoreDocuments`] implements it over any `object_store` backend
//! (S3 in production, in-memory in tests).

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use thiserror::Error;
use tracing::{debug, instrument};

/// Key prefix for archived documents.
pub const DOCUMENT_PREFIX: &str = "ScrapedBooks";

/// Fragments that mark an object-store error as throttling.
const THROTTLING_MARKERS: [&str; 5] = [
    "SlowDown",
    "Throttling",
    "ThrottlingException",
    "ProvisionedThroughputExceeded",
    "TooManyRequests",
];

/// Errors raised by the document archive.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store asked the client to slow down; worth retrying.
    #[error("object store throttled request for {key}: {source}")]
    Throttled {
        key: String,
        #[source]
        source: object_store::Error,
    },

    /// Any other object-store failure.
    #[error("object store request failed for {key}: {source}")]
    Fatal {
        key: String,
        #[source]
        source: object_store::Error,
    },

    /// The store could not be constructed.
    #[error("object store configuration error: {source}")]
    Configuration {
        #[source]
        source: object_store::Error,
    },
}

impl StorageError {
    /// Wraps an object-store error, separating throttling from everything else.
    #[must_use]
    pub fn classify(key: impl Into<String>, source: object_store::Error) -> Self {
        let message = source.to_string();
        let key = key.into();
        if THROTTLING_MARKERS.iter().any(|m| message.contains(m)) {
            Self::Throttled { key, source }
        } else {
            Self::Fatal { key, source }
        }
    }

    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// Destination for archived documents.
///
/// Uses `async_trait` so strategies can hold an `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Stores `body` as `ScrapedBooks/<name>.pdf`.
    async fn put_document(&self, name: &str, body: Bytes) -> Result<(), StorageError>;

    /// Lists the file names (including `.pdf`) under `ScrapedBooks/`.
    async fn list_documents(&self) -> Result<Vec<String>, StorageError>;
}

/// [`DocumentStore`] over an `object_store` backend.
#[derive(Debug, Clone)]
pub struct ObjectStoreDocuments {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreDocuments {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// In-memory store, useful for dry runs and tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()))
    }

    /// S3 bucket with credentials taken from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] if the builder rejects the settings.
    pub fn s3(bucket: &str, region: &str) -> Result<Self, StorageError> {
        let store = object_store::aws::AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(region)
            .build()
            .map_err(|source| StorageError::Configuration { source })?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Object key for a document name.
    #[must_use]
    pub fn document_key(name: &str) -> String {
        format!("{DOCUMENT_PREFIX}/{name}.pdf")
    }
}

#[async_trait]
impl DocumentStore for ObjectStoreDocuments {
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn put_document(&self, name: &str, body: Bytes) -> Result<(), StorageError> {
        let key = Self::document_key(name);
        self.store
            .put(&Path::from(key.as_str()), PutPayload::from(body))
            .await
            .map_err(|e| StorageError::classify(&key, e))?;
        debug!(%key, "document stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<String>, StorageError> {
        let prefix = Path::from(DOCUMENT_PREFIX);
        let objects: Vec<_> = self
            .store
            .list(Some(&prefix))
            .try_collect()
            .await
            .map_err(|e| StorageError::classify(DOCUMENT_PREFIX, e))?;

        let names: Vec<String> = objects
            .iter()
            .filter_map(|meta| meta.location.filename().map(str::to_string))
            .collect();
        debug!(documents = names.len(), "documents listed");
        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key_layout() {
        assert_eq!(
            ObjectStoreDocuments::document_key("A - B (2020)"),
            "ScrapedBooks/A - B (2020).pdf"
        );
    }

    #[test]
    fn test_classify_throttling_message() {
        let source = object_store::Error::Generic {
            store: "S3",
            source: "SlowDown: Please reduce your request rate".into(),
        };
        assert!(StorageError::classify("k", source).is_throttled());

        let source = object_store::Error::Generic {
            store: "S3",
            source: "AccessDenied".into(),
        };
        assert!(!StorageError::classify("k", source).is_throttled());
    }

    #[tokio::test]
    async fn test_put_then_list_in_memory() {
        let store = ObjectStoreDocuments::in_memory();
        store
            .put_document("A - B (2020)", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        store
            .put_document("C - D (2021)", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();

        let mut names = store.list_documents().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["A - B (2020).pdf", "C - D (2021).pdf"]);
    }
}
