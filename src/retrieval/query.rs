//! Query enhancement for the retrieval pipeline
//!
//! Expands abbreviations, maps colloquialisms to formal legal terms,
//! extracts exact-match keywords (statute numbers, case citations), and
//! builds the expanded semantic query for vector search.

use crate::ingest::metadata::{CASE_CITATION_PATTERN, STATUTE_NUMBER_PATTERN};
use crate::retrieval::EnhancedQuery;
use crate::vocab;

/// Enhance a raw user query for hybrid search. Pure function over the
/// fixed vocabulary tables.
pub fn enhance_query(raw_query: &str) -> EnhancedQuery {
    // 1. Expand abbreviations so both forms are searchable
    let corrected = vocab::expand_abbreviations(raw_query);

    // 2. Extract exact-match keywords from the expanded text
    let mut exact_keywords: Vec<String> = Vec::new();
    for caps in STATUTE_NUMBER_PATTERN.captures_iter(&corrected) {
        if let Some(m) = caps.get(1) {
            let value = m.as_str().to_string();
            if !exact_keywords.contains(&value) {
                exact_keywords.push(value);
            }
        }
    }
    for caps in CASE_CITATION_PATTERN.captures_iter(&corrected) {
        if let Some(m) = caps.get(1) {
            let value = m.as_str().to_string();
            if !exact_keywords.contains(&value) {
                exact_keywords.push(value);
            }
        }
    }

    // 3. Formal synonyms for colloquialisms in the raw query
    let synonyms = vocab::legal_synonyms(raw_query);

    // 4. Expanded semantic query
    let semantic_query = if synonyms.is_empty() {
        corrected.clone()
    } else {
        format!("{} {}", corrected, synonyms.join(" "))
    };

    // 5. Chapter hints from topic mapping
    let chapter_hints = vocab::chapter_hints(raw_query);

    tracing::info!(
        "Enhanced query: keywords={:?}, synonyms={}, chapters={:?}",
        exact_keywords,
        synonyms.len(),
        chapter_hints
    );

    EnhancedQuery {
        original: raw_query.to_string(),
        corrected_text: corrected,
        exact_keywords,
        semantic_query,
        chapter_hints,
        synonyms,
    }
}
