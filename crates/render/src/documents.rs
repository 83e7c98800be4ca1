//! Collaborator interfaces for document storage and view rights, with
//! in-memory implementations.

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use wikiflow_core::{CopyOnWrite, Syntax};

/// Source text of a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    /// Raw text.
    pub text: String,
    /// Syntax the text is written in.
    pub syntax: Syntax,
}

impl DocumentContent {
    /// Creates document content.
    pub fn new(text: impl Into<String>, syntax: Syntax) -> Self {
        Self {
            text: text.into(),
            syntax,
        }
    }
}

/// Failure reported by a [`DocumentAccess`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentAccessError {
    /// No document with that reference.
    #[error("Document [{0}] does not exist")]
    NotFound(String),
    /// The store failed while loading the document.
    #[error("Failed to load document [{reference}]: {message}")]
    Unavailable {
        /// Requested reference.
        reference: String,
        /// Store-specific description.
        message: String,
    },
}

/// Read access to stored documents.
pub trait DocumentAccess: Send + Sync {
    /// Loads the text and syntax of a document.
    fn content(&self, reference: &str) -> Result<DocumentContent, DocumentAccessError>;

    /// Whether a document exists.
    fn exists(&self, reference: &str) -> bool;
}

/// View-right checks.
pub trait Permissions: Send + Sync {
    /// Whether the current user may view the document.
    fn can_view(&self, reference: &str) -> bool;
}

/// Documents held in memory, keyed by reference.
#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    documents: CopyOnWrite<HashMap<String, DocumentContent>>,
}

impl InMemoryDocuments {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces a document.
    pub fn insert(&self, reference: impl Into<String>, text: impl Into<String>, syntax: Syntax) {
        let reference = reference.into();
        let content = DocumentContent::new(text, syntax);
        self.documents.update(|documents| {
            documents.insert(reference, content);
        });
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_document(
        self,
        reference: impl Into<String>,
        text: impl Into<String>,
        syntax: Syntax,
    ) -> Self {
        self.insert(reference, text, syntax);
        self
    }
}

impl DocumentAccess for InMemoryDocuments {
    fn content(&self, reference: &str) -> Result<DocumentContent, DocumentAccessError> {
        self.documents
            .load()
            .get(reference)
            .cloned()
            .ok_or_else(|| DocumentAccessError::NotFound(reference.to_string()))
    }

    fn exists(&self, reference: &str) -> bool {
        self.documents.load().contains_key(reference)
    }
}

/// Grants view rights on every document.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Permissions for AllowAll {
    fn can_view(&self, _reference: &str) -> bool {
        true
    }
}

/// Denies view rights on the listed documents only.
#[derive(Debug, Default, Clone)]
pub struct DenyList {
    denied: HashSet<String>,
}

impl DenyList {
    /// Creates a list denying `references`.
    pub fn new<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denied: references.into_iter().map(Into::into).collect(),
        }
    }
}

impl Permissions for DenyList {
    fn can_view(&self, reference: &str) -> bool {
        !self.denied.contains(reference)
    }
}
