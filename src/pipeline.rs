//! Query-time orchestration
//!
//! Wires query enhancement, hybrid search, relevance boosting, context
//! assembly, generation, and response formatting into one pipeline.

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{JurisError, Result};
use crate::generation::{
    build_prompt, format_response, system_prompt, AnswerResponse, ExtractiveGeneration,
    GenerationService, ResponseFlags, DISCLAIMER,
};
use crate::ingest::tokens::TokenCounter;
use crate::retrieval::{
    apply_relevance_boost, build_context_window, enhance_query, EnhancedQuery, HybridSearcher,
    LexicalHandle, RankedChunk,
};
use crate::store::VectorStore;
use std::sync::Arc;

/// Store reachability, reported without throwing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Ok { chunks: usize },
    Degraded,
}

/// Retrieval-only output for debugging and the `search` command.
#[derive(Debug)]
pub struct SearchOutput {
    pub results: Vec<RankedChunk>,
    pub enhanced_query: EnhancedQuery,
}

/// The full question-answering pipeline.
pub struct AnswerPipeline {
    store: Arc<dyn VectorStore>,
    searcher: HybridSearcher,
    lexical: Arc<LexicalHandle>,
    generator: Option<Arc<dyn GenerationService>>,
    fallback: ExtractiveGeneration,
    counter: TokenCounter,
    config: Config,
}

impl AnswerPipeline {
    /// Wire the pipeline together. Enabling the LLM without providing a
    /// generation service is a configuration error.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Option<Arc<dyn GenerationService>>,
        config: Config,
    ) -> Result<Self> {
        if config.llm.enabled && generator.is_none() {
            return Err(JurisError::Config(
                "llm.enabled is true but no generation service was provided".to_string(),
            ));
        }

        let counter = match &config.ingestion.tokenizer_file {
            Some(path) => TokenCounter::from_file(path)
                .map_err(|e| JurisError::Config(e.to_string()))?,
            None => TokenCounter::approximate(),
        };

        let lexical = Arc::new(LexicalHandle::new());
        let searcher = HybridSearcher::new(
            embedder,
            Arc::clone(&store),
            Arc::clone(&lexical),
            config.retrieval.rrf_k,
        );

        Ok(Self {
            store,
            searcher,
            lexical,
            generator,
            fallback: ExtractiveGeneration::default(),
            counter,
            config,
        })
    }

    /// Retrieval only: enhance, search, boost.
    pub async fn search(&self, raw_query: &str, n_results: usize) -> Result<SearchOutput> {
        let enhanced = enhance_query(raw_query);
        let results = self.searcher.search(&enhanced, n_results).await?;
        let boosted = apply_relevance_boost(results, &enhanced);
        Ok(SearchOutput {
            results: boosted,
            enhanced_query: enhanced,
        })
    }

    /// Full pipeline: retrieval, context assembly, generation, and
    /// response formatting. Zero results yield a well-formed
    /// low-confidence response, not an error.
    pub async fn answer(&self, raw_query: &str) -> Result<AnswerResponse> {
        let enhanced = enhance_query(raw_query);

        let results = self
            .searcher
            .search(&enhanced, self.config.retrieval.n_results)
            .await?;
        let boosted = apply_relevance_boost(results, &enhanced);

        if boosted.is_empty() {
            return Ok(no_results_response());
        }

        let context = build_context_window(
            &boosted,
            self.config.retrieval.context_token_limit,
            self.store.as_ref(),
            &self.counter,
            self.config.retrieval.max_chunks_per_ref,
        );

        let prompt = build_prompt(raw_query, &context.context_text, &context.sources);

        let raw_answer = match (&self.generator, self.config.llm.enabled) {
            (Some(generator), true) => generator
                .generate(
                    &prompt,
                    Some(system_prompt()),
                    &self.config.llm.model,
                    self.config.llm.temperature,
                )
                .map_err(JurisError::Generation)?,
            _ => self
                .fallback
                .generate(&prompt, Some(system_prompt()), "extractive", 0.0)
                .map_err(JurisError::Generation)?,
        };

        Ok(format_response(&raw_answer, &boosted, &enhanced, raw_query))
    }

    /// Mark a chunk superseded (or restore it). Returns false when the
    /// id is unknown. Invalidate-free: superseded filtering happens at
    /// query time, but the lexical snapshot must still be refreshed.
    pub async fn supersede(&self, doc_id: &str, superseded: bool) -> Result<bool> {
        let updated = self.store.set_superseded(doc_id, superseded)?;
        if updated {
            self.lexical.invalidate().await;
        }
        Ok(updated)
    }

    /// Drop the cached lexical index. Call after re-ingestion.
    pub async fn invalidate_lexical(&self) {
        self.lexical.invalidate().await;
    }

    /// Health check. Never throws: an unreachable store reports as
    /// degraded.
    pub fn health(&self) -> HealthStatus {
        match self.store.count() {
            Ok(chunks) => HealthStatus::Ok { chunks },
            Err(e) => {
                tracing::warn!("Health check degraded: {}", e);
                HealthStatus::Degraded
            }
        }
    }
}

/// Canned response when boosting leaves no candidates.
fn no_results_response() -> AnswerResponse {
    AnswerResponse {
        answer: format!(
            "I could not find relevant information in the available legal documents \
             to answer your question. Please try rephrasing or ask about a specific \
             Wisconsin statute or policy.\n\n{}",
            DISCLAIMER
        ),
        sources: Vec::new(),
        confidence_score: 0.0,
        flags: ResponseFlags {
            low_confidence: true,
            ..Default::default()
        },
        addendum_text: String::new(),
        disclaimer: DISCLAIMER.to_string(),
    }
}
