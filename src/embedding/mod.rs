//! Embedding service boundary
//!
//! The pipeline treats embedding as an external, order-preserving
//! text-to-vector service behind [`EmbeddingProvider`].

mod provider;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
