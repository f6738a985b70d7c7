//! Reciprocal Rank Fusion for combining search rankings

use ahash::{HashMap, HashMapExt};

/// Merge two ranked id lists using RRF.
///
/// For each id, score = sum of `1/(k + rank)` over every ranking it
/// appears in, with rank 1-indexed. Ids absent from a ranking
/// contribute nothing from it. Returns `(id, score)` pairs sorted by
/// score descending; equal scores order by id for reproducibility.
pub fn reciprocal_rank_fusion(
    semantic_ranking: &[String],
    lexical_ranking: &[String],
    k: f64,
) -> Vec<(String, f64)> {
    let mut scores: HashMap<&str, f64> = HashMap::new();

    for (rank, id) in semantic_ranking.iter().enumerate() {
        *scores.entry(id.as_str()).or_insert(0.0) += 1.0 / (k + (rank as f64) + 1.0);
    }

    for (rank, id) in lexical_ranking.iter().enumerate() {
        *scores.entry(id.as_str()).or_insert(0.0) += 1.0 / (k + (rank as f64) + 1.0);
    }

    let mut fused: Vec<(String, f64)> = scores
        .into_iter()
        .map(|(id, score)| (id.to_string(), score))
        .collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    fused
}
