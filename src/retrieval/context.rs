//! Context window assembly
//!
//! Packs ranked chunks into a token budget in rank order, following
//! cross-references to pull in cited law when space allows.

use crate::ingest::tokens::TokenCounter;
use crate::retrieval::cross_ref::{detect_cross_references, fetch_cross_referenced_chunks};
use crate::retrieval::RankedChunk;
use crate::store::VectorStore;
use serde::{Deserialize, Serialize};

/// Separator between chunks in the assembled context text.
const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Citation record for one chunk included in the context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub source_file: String,
    pub context_header: String,
    pub statute_numbers: Vec<String>,
    pub source_type: String,
    pub start_page: usize,
    pub title: String,
}

/// The assembled context window.
#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    pub context_text: String,
    pub sources: Vec<SourceRef>,
    pub cross_refs_followed: Vec<String>,
    pub total_tokens: usize,
}

fn source_ref(
    id: &str,
    metadata: &crate::ingest::metadata::ChunkMetadata,
) -> SourceRef {
    SourceRef {
        id: id.to_string(),
        source_file: metadata.source_file.clone(),
        context_header: metadata.context_header.clone(),
        statute_numbers: metadata.statute_numbers.clone(),
        source_type: metadata.source_type.as_str().to_string(),
        start_page: metadata.start_page,
        title: metadata.title.clone(),
    }
}

/// Assemble a context string from ranked chunks within a token budget.
///
/// Greedy single pass in rank order: the first ranked chunk that would
/// exceed the budget stops the pass entirely. Cross-references found in
/// included chunks are looked up and appended when they still fit;
/// oversized cross-ref chunks are skipped individually. Every attempted
/// reference is recorded so it is never retried within one assembly.
/// Empty input yields an empty window with zero tokens.
pub fn build_context_window(
    ranked_chunks: &[RankedChunk],
    token_limit: usize,
    store: &dyn VectorStore,
    counter: &TokenCounter,
    max_chunks_per_ref: usize,
) -> ContextWindow {
    let mut context_parts: Vec<String> = Vec::new();
    let mut sources: Vec<SourceRef> = Vec::new();
    let mut seen_ids: Vec<String> = Vec::new();
    let mut cross_refs_followed: Vec<String> = Vec::new();
    let mut total_tokens = 0usize;

    for chunk in ranked_chunks {
        if seen_ids.contains(&chunk.id) {
            continue;
        }

        let chunk_tokens = counter.count(&chunk.document);
        if total_tokens + chunk_tokens > token_limit {
            break;
        }

        context_parts.push(chunk.document.clone());
        total_tokens += chunk_tokens;
        seen_ids.push(chunk.id.clone());
        sources.push(source_ref(&chunk.id, &chunk.metadata));

        // Follow any cross-references not already attempted
        let refs = detect_cross_references(&chunk.document);
        let new_refs: Vec<String> = refs
            .into_iter()
            .filter(|r| !cross_refs_followed.contains(r))
            .collect();
        if new_refs.is_empty() {
            continue;
        }

        let xref_chunks = fetch_cross_referenced_chunks(&new_refs, store, max_chunks_per_ref);
        cross_refs_followed.extend(new_refs);

        for xref in xref_chunks {
            if seen_ids.contains(&xref.id) {
                continue;
            }

            let xref_tokens = counter.count(&xref.document);
            if total_tokens + xref_tokens > token_limit {
                continue; // skip this cross-ref but try others
            }

            total_tokens += xref_tokens;
            seen_ids.push(xref.id.clone());
            sources.push(source_ref(&xref.id, &xref.metadata));
            context_parts.push(xref.document);
        }
    }

    let context_text = context_parts.join(CHUNK_SEPARATOR);

    tracing::info!(
        "Context window: {} chunks, {} tokens, {} cross-refs followed",
        sources.len(),
        total_tokens,
        cross_refs_followed.len()
    );

    ContextWindow {
        context_text,
        sources,
        cross_refs_followed,
        total_tokens,
    }
}
