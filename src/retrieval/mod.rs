//! Hybrid retrieval pipeline
//!
//! Query enhancement, semantic + lexical search fused with Reciprocal
//! Rank Fusion, domain relevance boosting, and cross-reference-following
//! context assembly.

mod boost;
mod context;
mod cross_ref;
mod fusion;
mod hybrid;
mod lexical;
mod query;

pub use boost::apply_relevance_boost;
pub use context::{build_context_window, ContextWindow, SourceRef};
pub use cross_ref::{detect_cross_references, fetch_cross_referenced_chunks};
pub use fusion::reciprocal_rank_fusion;
pub use hybrid::{HybridSearcher, SearchError};
pub use lexical::{LexicalHandle, LexicalIndex};
pub use query::enhance_query;

use crate::ingest::metadata::ChunkMetadata;
use serde::{Deserialize, Serialize};

/// Enhanced form of a user query, built once per request and passed
/// through the whole pipeline. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedQuery {
    /// The original query, unchanged
    pub original: String,
    /// Query with abbreviations expanded inline
    pub corrected_text: String,
    /// Literal statute numbers / case citations found in the query
    pub exact_keywords: Vec<String>,
    /// Expanded string used for vector search
    pub semantic_query: String,
    /// Statute chapter numbers hinted by query topics
    pub chapter_hints: Vec<String>,
    /// Formal synonyms for colloquial query terms
    pub synonyms: Vec<String>,
}

/// One retrieval result. Identity is `id`; `rrf_score` is positive for
/// every fused result; `boosted_score` is set by relevance boosting.
#[derive(Debug, Clone)]
pub struct RankedChunk {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    pub rrf_score: f64,
    pub boosted_score: Option<f64>,
}

impl RankedChunk {
    /// Boosted score when present, RRF score otherwise.
    pub fn effective_score(&self) -> f64 {
        self.boosted_score.unwrap_or(self.rrf_score)
    }
}
