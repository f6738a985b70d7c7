//! Confidence scoring and final response assembly
//!
//! The confidence score is a function of retrieval signals only, never
//! of the generated answer's phrasing, so safety and compliance flags
//! cannot be steered by model output.

use crate::generation::safety::build_safety_addendum;
use crate::retrieval::{EnhancedQuery, RankedChunk};
use serde::{Deserialize, Serialize};

pub const DISCLAIMER: &str = "Disclaimer: This system provides legal information, not formal \
                              legal advice. Always verify with current statutes.";

/// Empirical RRF ceiling for a rank-1-in-both-lists hit with k=60,
/// used to normalize the top score into [0, 1].
const RRF_CEILING: f64 = 0.033;

/// Variance scale that saturates the score-spread component.
const VARIANCE_CEILING: f64 = 0.0001;

/// Boolean flags attached to every response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseFlags {
    #[serde(rename = "LOW_CONFIDENCE")]
    pub low_confidence: bool,
    #[serde(rename = "OUTDATED_POSSIBLE")]
    pub outdated_possible: bool,
    #[serde(rename = "JURISDICTION_NOTE")]
    pub jurisdiction_note: bool,
    #[serde(rename = "USE_OF_FORCE_CAUTION")]
    pub use_of_force_caution: bool,
}

/// One cited source in the formatted response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub title: String,
    pub source_file: String,
    pub context_header: String,
    pub source_type: String,
    /// Leading 500 characters of the chunk text
    pub document: String,
    pub score: f64,
    pub chunk_id: String,
    pub statute_numbers: Vec<String>,
    pub case_citations: Vec<String>,
}

/// The fully assembled answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<SourceInfo>,
    pub confidence_score: f64,
    pub flags: ResponseFlags,
    /// Advisory text from safety checks, kept separate from the answer
    pub addendum_text: String,
    pub disclaimer: String,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Sample variance of the scores (n - 1 denominator).
fn variance(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (scores.len() - 1) as f64
}

/// Compute the confidence score in [0, 1] (rounded to 3 decimals) and
/// whether it falls below the low-confidence threshold.
///
/// Components only ever add:
///   - base 0.20
///   - +0.25 exact keyword hit on the top result, or synonym hit in the
///     top 3 when the query had no exact keywords
///   - +0.30 x normalized top score
///   - +0.10 x normalized top-5 score variance (5+ results only)
///   - +0.10 per distinct source file in the top 5, capped at +0.30
pub fn compute_confidence(results: &[RankedChunk], query: &EnhancedQuery) -> (f64, bool) {
    if results.is_empty() {
        return (0.0, true);
    }

    let mut score = 0.20;

    // 1. Topic relevance: exact statute/citation match is the strongest
    //    signal; synonyms are the fallback when no exact keywords exist
    if !query.exact_keywords.is_empty() {
        let top = &results[0].metadata;
        let hit = query.exact_keywords.iter().any(|kw| {
            top.statute_numbers.contains(kw) || top.case_citations.contains(kw)
        });
        if hit {
            score += 0.25;
        }
    } else if !query.synonyms.is_empty() {
        let top3_text: String = results
            .iter()
            .take(3)
            .map(|r| {
                format!(
                    "{} {} {}",
                    r.document, r.metadata.title, r.metadata.context_header
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if query
            .synonyms
            .iter()
            .any(|syn| top3_text.contains(&syn.to_lowercase()))
        {
            score += 0.25;
        }
    }

    // 2. Normalized top score
    let top_score = results[0].effective_score();
    score += 0.30 * (top_score / RRF_CEILING).min(1.0);

    // 3. Spread between the top result and the rest
    if results.len() >= 5 {
        let top5: Vec<f64> = results.iter().take(5).map(|r| r.effective_score()).collect();
        let variance_factor = (variance(&top5) / VARIANCE_CEILING).min(1.0);
        score += 0.10 * variance_factor.max(0.0);
    }

    // 4. Distinct source files in the top 5
    let mut distinct_files: Vec<String> = Vec::new();
    for (i, result) in results.iter().take(5).enumerate() {
        let file = if result.metadata.source_file.is_empty() {
            format!("unknown_{}", i)
        } else {
            result.metadata.source_file.clone()
        };
        if !distinct_files.contains(&file) {
            distinct_files.push(file);
        }
    }
    score += (distinct_files.len() as f64 * 0.10).min(0.30);

    let confidence = round3(score.clamp(0.0, 1.0));
    (confidence, confidence < 0.6)
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Assemble the final response: confidence, safety flags, capped source
/// list, advisory addendum, and the fixed disclaimer. The model's
/// output is used as plain text; nothing is parsed out of it.
pub fn format_response(
    raw_answer: &str,
    results: &[RankedChunk],
    query: &EnhancedQuery,
    raw_query: &str,
) -> AnswerResponse {
    let answer = raw_answer.trim().to_string();

    let (confidence_score, low_confidence) = compute_confidence(results, query);

    let safety_sources: Vec<&crate::ingest::metadata::ChunkMetadata> =
        results.iter().take(5).map(|r| &r.metadata).collect();
    let safety = build_safety_addendum(raw_query, &answer, &safety_sources);

    let sources: Vec<SourceInfo> = results
        .iter()
        .take(3)
        .map(|r| SourceInfo {
            title: if r.metadata.title.is_empty() {
                "Unknown".to_string()
            } else {
                r.metadata.title.clone()
            },
            source_file: r.metadata.source_file.clone(),
            context_header: r.metadata.context_header.clone(),
            source_type: r.metadata.source_type.as_str().to_string(),
            document: preview(&r.document, 500),
            score: r.effective_score(),
            chunk_id: r.id.clone(),
            statute_numbers: r.metadata.statute_numbers.clone(),
            case_citations: r.metadata.case_citations.clone(),
        })
        .collect();

    AnswerResponse {
        answer,
        sources,
        confidence_score,
        flags: ResponseFlags {
            low_confidence,
            outdated_possible: safety.outdated_possible,
            jurisdiction_note: safety.jurisdiction_note,
            use_of_force_caution: safety.use_of_force_caution,
        },
        addendum_text: safety.addendum_text,
        disclaimer: DISCLAIMER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::metadata::{ChunkMetadata, Jurisdiction, SourceType};

    fn meta(source_file: &str, statutes: &[&str]) -> ChunkMetadata {
        ChunkMetadata {
            doc_id: "id".to_string(),
            source_type: SourceType::Statute,
            jurisdiction: Jurisdiction::State,
            superseded: false,
            title: "ch943".to_string(),
            source_file: source_file.to_string(),
            chunk_index: 0,
            start_page: 1,
            end_page: 1,
            context_header: "Chapter 943".to_string(),
            statute_numbers: statutes.iter().map(|s| s.to_string()).collect(),
            case_citations: vec![],
            chapter_numbers: vec![],
            token_count: 5,
        }
    }

    fn chunk(id: &str, score: f64, source_file: &str, statutes: &[&str]) -> RankedChunk {
        RankedChunk {
            id: id.to_string(),
            document: format!("document text {}", id),
            metadata: meta(source_file, statutes),
            rrf_score: score,
            boosted_score: Some(score),
        }
    }

    fn query() -> EnhancedQuery {
        EnhancedQuery {
            original: "q".to_string(),
            corrected_text: "q".to_string(),
            exact_keywords: vec![],
            semantic_query: "q".to_string(),
            chapter_hints: vec![],
            synonyms: vec![],
        }
    }

    #[test]
    fn test_no_results_zero_confidence() {
        let (confidence, low) = compute_confidence(&[], &query());
        assert_eq!(confidence, 0.0);
        assert!(low);
    }

    #[test]
    fn test_exact_keyword_match_adds_quarter() {
        let results = vec![chunk("a", 0.033, "/data/a.txt", &["943.50"])];
        let mut with_kw = query();
        with_kw.exact_keywords = vec!["943.50".to_string()];

        let (with_match, _) = compute_confidence(&results, &with_kw);
        let (without, _) = compute_confidence(&results, &query());
        assert!((with_match - without - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_exact_keyword_miss_no_synonym_fallback() {
        // Exact keywords that miss must not fall through to synonyms
        let results = vec![chunk("a", 0.033, "/data/a.txt", &["940.01"])];
        let mut q = query();
        q.exact_keywords = vec!["943.50".to_string()];
        q.synonyms = vec!["document".to_string()]; // would match text

        let (score, _) = compute_confidence(&results, &q);
        // base 0.20 + 0.30 top score + 0.10 one distinct file
        assert!((score - 0.60).abs() < 1e-9);
    }

    #[test]
    fn test_synonym_fallback_in_top3() {
        let results = vec![chunk("a", 0.033, "/data/a.txt", &[])];
        let mut q = query();
        q.synonyms = vec!["DOCUMENT".to_string()];

        let (score, low) = compute_confidence(&results, &q);
        assert!((score - 0.85).abs() < 1e-9);
        assert!(!low);
    }

    #[test]
    fn test_top_score_normalization_saturates() {
        let capped = vec![chunk("a", 0.10, "/data/a.txt", &[])];
        let exact = vec![chunk("a", 0.033, "/data/a.txt", &[])];

        let (capped_score, _) = compute_confidence(&capped, &query());
        let (exact_score, _) = compute_confidence(&exact, &query());
        assert_eq!(capped_score, exact_score);
    }

    #[test]
    fn test_distinct_sources_capped() {
        let results: Vec<RankedChunk> = (0..5)
            .map(|i| chunk(&format!("c{}", i), 0.001, &format!("/data/f{}.txt", i), &[]))
            .collect();

        let (score, _) = compute_confidence(&results, &query());
        // 0.20 base + 0.30*(0.001/0.033) + variance 0 + 0.30 cap
        let expected = round3(0.20 + 0.30 * (0.001 / 0.033) + 0.30);
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_variance_component_nonnegative() {
        let uniform: Vec<RankedChunk> = (0..5)
            .map(|i| chunk(&format!("c{}", i), 0.01, "/data/same.txt", &[]))
            .collect();
        let (uniform_score, _) = compute_confidence(&uniform, &query());

        let mut spread = uniform.clone();
        spread[0].boosted_score = Some(0.033);
        let (spread_score, _) = compute_confidence(&spread, &query());

        assert!(spread_score >= uniform_score);
    }

    #[test]
    fn test_confidence_clamped_and_rounded() {
        let results: Vec<RankedChunk> = (0..5)
            .map(|i| chunk(&format!("c{}", i), 0.5, &format!("/data/f{}.txt", i), &["943.50"]))
            .collect();
        let mut q = query();
        q.exact_keywords = vec!["943.50".to_string()];

        let (score, low) = compute_confidence(&results, &q);
        assert!(score <= 1.0);
        assert!(!low);
        assert_eq!(score, round3(score));
    }

    #[test]
    fn test_format_response_caps_sources_at_three() {
        let results: Vec<RankedChunk> = (0..6)
            .map(|i| chunk(&format!("c{}", i), 0.01, &format!("/data/f{}.txt", i), &[]))
            .collect();

        let response = format_response("the answer", &results, &query(), "raw query");
        assert_eq!(response.sources.len(), 3);
        assert_eq!(response.answer, "the answer");
        assert_eq!(response.disclaimer, DISCLAIMER);
    }

    #[test]
    fn test_format_response_document_preview() {
        let mut long = chunk("a", 0.01, "/data/a.txt", &[]);
        long.document = "x".repeat(900);

        let response = format_response("ans", &[long], &query(), "q");
        assert_eq!(response.sources[0].document.chars().count(), 500);
    }

    #[test]
    fn test_format_response_safety_flags_from_query() {
        let results = vec![chunk("a", 0.01, "/data/a.txt", &[])];
        let response = format_response("ans", &results, &query(), "taser deployment rules");
        assert!(response.flags.use_of_force_caution);
        assert!(response.addendum_text.contains("use of force"));
        // The advisory stays out of the answer body
        assert_eq!(response.answer, "ans");
    }
}
