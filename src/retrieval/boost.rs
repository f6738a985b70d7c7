//! Domain-specific relevance boosting
//!
//! Applies metadata-driven score multipliers after rank fusion and
//! drops superseded documents outright.

use crate::ingest::metadata::Jurisdiction;
use crate::retrieval::{EnhancedQuery, RankedChunk};

/// Apply relevance multipliers to fused search results.
///
/// Multipliers compose multiplicatively:
///   - superseded            -> dropped entirely
///   - "policy" query AND local_department jurisdiction -> 1.5x
///   - state jurisdiction    -> 1.2x
///   - exact statute match   -> 1.3x
///   - chapter hint match    -> 1.15x
///
/// Returns the surviving results re-sorted by `boosted_score`
/// descending. Pure function of its inputs, so re-applying it to an
/// already boosted list reproduces the same scores.
pub fn apply_relevance_boost(
    ranked_results: Vec<RankedChunk>,
    enhanced_query: &EnhancedQuery,
) -> Vec<RankedChunk> {
    let is_policy_query = enhanced_query.original.to_lowercase().contains("policy");
    let input_len = ranked_results.len();

    let mut boosted: Vec<RankedChunk> = Vec::with_capacity(input_len);

    for mut result in ranked_results {
        if result.metadata.superseded {
            tracing::debug!("Dropping superseded document: {}", result.id);
            continue;
        }

        let mut multiplier = 1.0f64;

        if is_policy_query && result.metadata.jurisdiction == Jurisdiction::LocalDepartment {
            multiplier *= 1.5;
        }

        if result.metadata.jurisdiction == Jurisdiction::State {
            multiplier *= 1.2;
        }

        if !enhanced_query.exact_keywords.is_empty()
            && result
                .metadata
                .statute_numbers
                .iter()
                .any(|s| enhanced_query.exact_keywords.contains(s))
        {
            multiplier *= 1.3;
        }

        if !enhanced_query.chapter_hints.is_empty()
            && result
                .metadata
                .chapter_numbers
                .iter()
                .any(|c| enhanced_query.chapter_hints.contains(c))
        {
            multiplier *= 1.15;
        }

        result.boosted_score = Some(result.rrf_score * multiplier);
        boosted.push(result);
    }

    boosted.sort_by(|a, b| {
        b.effective_score()
            .partial_cmp(&a.effective_score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    tracing::info!(
        "Relevance boost: {} in -> {} out (policy_query={})",
        input_len,
        boosted.len(),
        is_policy_query
    );

    boosted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::metadata::{ChunkMetadata, SourceType};

    fn chunk(id: &str, rrf_score: f64) -> RankedChunk {
        RankedChunk {
            id: id.to_string(),
            document: "text".to_string(),
            metadata: ChunkMetadata {
                doc_id: id.to_string(),
                source_type: SourceType::Statute,
                jurisdiction: Jurisdiction::State,
                superseded: false,
                title: String::new(),
                source_file: String::new(),
                chunk_index: 0,
                start_page: 1,
                end_page: 1,
                context_header: String::new(),
                statute_numbers: vec![],
                case_citations: vec![],
                chapter_numbers: vec![],
                token_count: 5,
            },
            rrf_score,
            boosted_score: None,
        }
    }

    fn query(original: &str) -> EnhancedQuery {
        EnhancedQuery {
            original: original.to_string(),
            corrected_text: original.to_string(),
            exact_keywords: vec![],
            semantic_query: original.to_string(),
            chapter_hints: vec![],
            synonyms: vec![],
        }
    }

    #[test]
    fn test_state_jurisdiction_boost() {
        let results = apply_relevance_boost(vec![chunk("a", 0.030)], &query("theft question"));
        let boosted = results[0].boosted_score.unwrap();
        assert!((boosted - 0.036).abs() < 1e-9);
    }

    #[test]
    fn test_state_plus_exact_statute_match() {
        let mut c = chunk("a", 0.030);
        c.metadata.statute_numbers = vec!["943.50".to_string()];
        let mut q = query("retail theft 943.50");
        q.exact_keywords = vec!["943.50".to_string()];

        let results = apply_relevance_boost(vec![c], &q);
        let boosted = results[0].boosted_score.unwrap();
        assert!((boosted - 0.0468).abs() < 1e-9);
    }

    #[test]
    fn test_policy_query_local_department() {
        let mut c = chunk("a", 0.010);
        c.metadata.jurisdiction = Jurisdiction::LocalDepartment;

        let results = apply_relevance_boost(vec![c], &query("what is the pursuit policy"));
        let boosted = results[0].boosted_score.unwrap();
        // 1.5x local policy boost, no state boost
        assert!((boosted - 0.015).abs() < 1e-9);
    }

    #[test]
    fn test_chapter_hint_boost() {
        let mut c = chunk("a", 0.010);
        c.metadata.chapter_numbers = vec!["943".to_string()];
        let mut q = query("theft");
        q.chapter_hints = vec!["943".to_string()];

        let results = apply_relevance_boost(vec![c], &q);
        let boosted = results[0].boosted_score.unwrap();
        // 1.2 (state) * 1.15 (chapter hint)
        assert!((boosted - 0.010 * 1.2 * 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_superseded_dropped() {
        let mut c = chunk("a", 0.030);
        c.metadata.superseded = true;

        let results = apply_relevance_boost(vec![c, chunk("b", 0.010)], &query("theft"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "b");
    }

    #[test]
    fn test_resorts_by_boosted_score() {
        let mut local = chunk("a", 0.020);
        local.metadata.jurisdiction = Jurisdiction::LocalDepartment;
        let state = chunk("b", 0.019);

        // Without a policy query the local chunk gets no boost while the
        // state chunk gets 1.2x, overtaking it
        let results = apply_relevance_boost(vec![local, state], &query("theft"));
        assert_eq!(results[0].id, "b");
    }

    #[test]
    fn test_idempotent_under_reapplication() {
        let mut c = chunk("a", 0.030);
        c.metadata.statute_numbers = vec!["943.50".to_string()];
        let mut q = query("943.50 policy");
        q.exact_keywords = vec!["943.50".to_string()];

        let once = apply_relevance_boost(vec![c], &q);
        let twice = apply_relevance_boost(once.clone(), &q);
        assert_eq!(
            once[0].boosted_score.unwrap(),
            twice[0].boosted_score.unwrap()
        );
    }
}
