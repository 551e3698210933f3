use crate::domain::device::UserDevices;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Location of one document inside the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    pub collection: String,
    pub doc_id: String,
}

impl DocumentPath {
    #[must_use]
    pub fn new(collection: impl Into<String>, doc_id: impl Into<String>) -> Self {
        Self { collection: collection.into(), doc_id: doc_id.into() }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.doc_id)
    }
}

/// Dotted path to a single field inside a document. Segments are kept
/// unescaped; adapters apply whatever quoting their wire format needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { segments: segments.into_iter().map(Into::into).collect() }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found")]
    NotFound,
    #[error("Authorization failed: {0}")]
    Unauthorized(String),
    #[error("Store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("External service error: {0}")]
    Other(#[from] anyhow::Error),
}

/// A document database holding one registration document per user.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Upserts the given fields into the document, creating it if absent.
    ///
    /// Merge semantics: `userId` and each entry of the `devices` map present
    /// in `doc` are replaced wholesale; device entries not present in `doc`
    /// stay untouched.
    ///
    /// # Errors
    /// Returns `StoreError` if the write is rejected or the store is
    /// unreachable.
    async fn merge_write(&self, path: &DocumentPath, doc: &UserDevices) -> Result<(), StoreError>;

    /// Removes a single field from the document. Deleting from a document
    /// that does not exist is a no-op, not an error.
    ///
    /// # Errors
    /// Returns `StoreError` if the delete is rejected or the store is
    /// unreachable.
    async fn delete_field(&self, path: &DocumentPath, field: &FieldPath) -> Result<(), StoreError>;
}
