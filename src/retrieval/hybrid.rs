//! Hybrid search combining semantic and lexical retrieval

use crate::embedding::EmbeddingProvider;
use crate::retrieval::{reciprocal_rank_fusion, EnhancedQuery, LexicalHandle, RankedChunk};
use crate::store::{StoreEntry, VectorStore};
use ahash::{HashMap, HashMapExt};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingError(String),

    #[error("Store query failed: {0}")]
    StoreError(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Hybrid searcher: vector similarity and BM25 keyword rankings fused
/// with Reciprocal Rank Fusion.
pub struct HybridSearcher {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    lexical: Arc<LexicalHandle>,
    rrf_k: f64,
}

impl HybridSearcher {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        lexical: Arc<LexicalHandle>,
        rrf_k: f64,
    ) -> Self {
        Self {
            embedder,
            store,
            lexical,
            rrf_k,
        }
    }

    /// Run semantic + lexical search and merge the rankings.
    ///
    /// Every returned result carries `rrf_score > 0`: an id appears
    /// only if it was top-ranked in at least one of the two rankings.
    pub async fn search(
        &self,
        query: &EnhancedQuery,
        n_results: usize,
    ) -> Result<Vec<RankedChunk>, SearchError> {
        if query.semantic_query.trim().is_empty() {
            return Err(SearchError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }

        // Step 1: semantic search against the vector store
        let query_embedding = self
            .embedder
            .embed(&query.semantic_query)
            .map_err(|e| SearchError::EmbeddingError(e.to_string()))?;

        let semantic_entries = self
            .store
            .query(&query_embedding, n_results)
            .map_err(|e| SearchError::StoreError(e.to_string()))?;

        let semantic_ids: Vec<String> = semantic_entries.iter().map(|e| e.id.clone()).collect();

        let mut doc_lookup: HashMap<String, StoreEntry> = HashMap::new();
        for entry in semantic_entries {
            doc_lookup.insert(entry.id.clone(), entry);
        }

        // Step 2: lexical search over the cached index snapshot
        let lexical_index = self
            .lexical
            .get_or_build(self.store.as_ref())
            .await
            .map_err(|e| SearchError::StoreError(e.to_string()))?;

        let mut lexical_ids: Vec<String> = Vec::new();
        for (entry, _score) in lexical_index.top_n(&query.corrected_text, n_results) {
            lexical_ids.push(entry.id.clone());
            doc_lookup.entry(entry.id.clone()).or_insert(entry);
        }

        // Step 3: Reciprocal Rank Fusion
        let fused = reciprocal_rank_fusion(&semantic_ids, &lexical_ids, self.rrf_k);

        // Step 4: attach documents/metadata and truncate
        let mut results: Vec<RankedChunk> = Vec::new();
        for (id, rrf_score) in fused {
            if let Some(entry) = doc_lookup.get(&id) {
                results.push(RankedChunk {
                    id,
                    document: entry.document.clone(),
                    metadata: entry.metadata.clone(),
                    rrf_score,
                    boosted_score: None,
                });
            }
            if results.len() >= n_results {
                break;
            }
        }

        tracing::info!(
            "Hybrid search: {} semantic + {} lexical -> {} fused results",
            semantic_ids.len(),
            lexical_ids.len(),
            results.len()
        );

        Ok(results)
    }
}
