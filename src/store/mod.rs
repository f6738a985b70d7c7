//! Vector store abstraction
//!
//! The corpus lives in a content-addressable document store supporting
//! vector similarity query, metadata filtering, and idempotent upsert.
//! Metadata values at this boundary are flat scalars only, which is why
//! multi-valued fields serialize to comma-joined strings.

mod embedded;

pub use embedded::EmbeddedStore;

use crate::ingest::metadata::ChunkMetadata;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Store capacity exceeded: {capacity}")]
    CapacityExceeded { capacity: usize },

    #[error("Record not found: {id}")]
    NotFound { id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A record to upsert: id, document text, embedding, metadata.
#[derive(Debug, Clone)]
pub struct StoreRecord {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A record as returned from queries and lookups.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// Flat metadata fields addressable by filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    StatuteNumbers,
    CaseCitations,
    ChapterNumbers,
    SourceFile,
    SourceType,
    Jurisdiction,
}

/// Substring-containment predicate over one flat metadata field — the
/// only filter shape the store supports.
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    pub field: MetadataField,
    pub contains: String,
}

impl MetadataFilter {
    pub fn contains(field: MetadataField, needle: impl Into<String>) -> Self {
        Self {
            field,
            contains: needle.into(),
        }
    }

    /// Evaluate the predicate against a record's metadata, using the
    /// flat (comma-joined) serialization of multi-valued fields.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        let haystack = match self.field {
            MetadataField::StatuteNumbers => metadata.statute_numbers_text(),
            MetadataField::CaseCitations => metadata.case_citations_text(),
            MetadataField::ChapterNumbers => metadata.chapter_numbers_text(),
            MetadataField::SourceFile => metadata.source_file.clone(),
            MetadataField::SourceType => metadata.source_type.as_str().to_string(),
            MetadataField::Jurisdiction => metadata.jurisdiction.as_str().to_string(),
        };
        haystack.contains(&self.contains)
    }
}

/// Store contract consumed by ingestion and retrieval.
///
/// `upsert` is idempotent by id; `query` returns entries ranked by
/// vector similarity; `get_where` applies the metadata filter;
/// `set_superseded` retires (or restores) a chunk out-of-band without
/// re-embedding.
pub trait VectorStore: Send + Sync {
    fn upsert(&self, records: Vec<StoreRecord>) -> Result<(), StoreError>;

    fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<StoreEntry>, StoreError>;

    fn get_where(&self, filter: &MetadataFilter) -> Result<Vec<StoreEntry>, StoreError>;

    fn get_all(&self) -> Result<Vec<StoreEntry>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    fn set_superseded(&self, doc_id: &str, superseded: bool) -> Result<bool, StoreError>;
}
