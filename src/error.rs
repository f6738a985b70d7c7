use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::generation::GenerationError;
use crate::ingest::IngestError;
use crate::retrieval::SearchError;
use crate::store::StoreError;

/// Main error type for the juris pipeline
#[derive(Error, Debug)]
pub enum JurisError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Ingestion errors
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// Vector store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Embedding service errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Search errors
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Generation service errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for juris operations
pub type Result<T> = std::result::Result<T, JurisError>;
