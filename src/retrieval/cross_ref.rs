//! Cross-reference detection and citation chain following
//!
//! Detects statute and chapter references in chunk text (e.g. "see
//! also § 940.01") and fetches the cited chunks from the store.

use crate::store::{MetadataField, MetadataFilter, StoreEntry, VectorStore};
use regex::Regex;
use std::sync::LazyLock;

static CROSS_REF_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "see also § 940.01", "see section 346.63"
        r"(?i)see\s+(?:also\s+)?(?:\u{a7}|section|sec\.)\s*(\d{2,4}\.\d{2,4})",
        // "under § 940.01", "per section 346.63", "pursuant to § 940.01"
        r"(?i)(?:under|per|pursuant\s+to)\s+(?:\u{a7}|section|sec\.)\s*(\d{2,4}\.\d{2,4})",
        // "§ 940.01 applies", "section 346.63 governs"
        r"(?i)(?:\u{a7}|section|sec\.)\s*(\d{2,4}\.\d{2,4})\s+(?:applies|governs|provides|requires|prohibits)",
        // "Chapter 943"
        r"(?i)Chapter\s+(\d+[A-Z]?)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("cross-reference pattern"))
    .collect()
});

/// Extract statute/chapter numbers from cross-reference language,
/// deduplicated in discovery order.
pub fn detect_cross_references(text: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for pattern in CROSS_REF_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                let value = m.as_str().to_string();
                if !refs.contains(&value) {
                    refs.push(value);
                }
            }
        }
    }
    refs
}

/// Look up cross-referenced statutes/chapters in the store.
///
/// Dotted references match on statute numbers, bare numbers on chapter
/// numbers. Superseded chunks are skipped and at most
/// `max_chunks_per_ref` chunks are taken per reference. A failed
/// lookup is logged and skipped; it never aborts the caller.
pub fn fetch_cross_referenced_chunks(
    references: &[String],
    store: &dyn VectorStore,
    max_chunks_per_ref: usize,
) -> Vec<StoreEntry> {
    if references.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<StoreEntry> = Vec::new();
    let mut seen_ids: Vec<String> = Vec::new();

    for reference in references {
        let field = if reference.contains('.') {
            MetadataField::StatuteNumbers
        } else {
            MetadataField::ChapterNumbers
        };
        let filter = MetadataFilter::contains(field, reference.clone());

        let matches = match store.get_where(&filter) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Failed to fetch cross-ref '{}': {}", reference, e);
                continue;
            }
        };

        let mut added = 0usize;
        for entry in matches {
            if seen_ids.contains(&entry.id) {
                continue;
            }
            if entry.metadata.superseded {
                continue;
            }

            seen_ids.push(entry.id.clone());
            results.push(entry);
            added += 1;
            if added >= max_chunks_per_ref {
                break;
            }
        }
    }

    tracing::info!(
        "Cross-ref fetch: {} refs -> {} chunks",
        references.len(),
        results.len()
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::metadata::{ChunkMetadata, Jurisdiction, SourceType};
    use crate::store::{EmbeddedStore, StoreRecord};

    #[test]
    fn test_detect_see_also_and_chapter() {
        let refs = detect_cross_references("See also \u{a7} 940.01 and Chapter 943.");
        assert_eq!(refs, vec!["940.01".to_string(), "943".to_string()]);
    }

    #[test]
    fn test_detect_pursuant_to() {
        let refs = detect_cross_references("Penalties are set pursuant to section 346.65.");
        assert_eq!(refs, vec!["346.65".to_string()]);
    }

    #[test]
    fn test_detect_governs_phrasing() {
        let refs = detect_cross_references("\u{a7} 968.24 governs temporary questioning.");
        assert_eq!(refs, vec!["968.24".to_string()]);
    }

    #[test]
    fn test_detect_deduplicates() {
        let refs =
            detect_cross_references("See \u{a7} 940.01. Under \u{a7} 940.01, intent matters.");
        assert_eq!(refs, vec!["940.01".to_string()]);
    }

    #[test]
    fn test_detect_nothing() {
        assert!(detect_cross_references("no references here").is_empty());
    }

    fn record(id: &str, statutes: &[&str], chapters: &[&str], superseded: bool) -> StoreRecord {
        StoreRecord {
            id: id.to_string(),
            document: format!("document {}", id),
            embedding: vec![1.0, 0.0, 0.0, 0.0],
            metadata: ChunkMetadata {
                doc_id: id.to_string(),
                source_type: SourceType::Statute,
                jurisdiction: Jurisdiction::State,
                superseded,
                title: String::new(),
                source_file: String::new(),
                chunk_index: 0,
                start_page: 1,
                end_page: 1,
                context_header: String::new(),
                statute_numbers: statutes.iter().map(|s| s.to_string()).collect(),
                case_citations: vec![],
                chapter_numbers: chapters.iter().map(|s| s.to_string()).collect(),
                token_count: 5,
            },
        }
    }

    #[test]
    fn test_fetch_statute_and_chapter_refs() {
        let store = EmbeddedStore::with_dimension(4);
        store
            .upsert(vec![
                record("s1", &["940.01"], &["940"], false),
                record("c1", &[], &["943"], false),
                record("other", &["346.63"], &["346"], false),
            ])
            .unwrap();

        let refs = vec!["940.01".to_string(), "943".to_string()];
        let chunks = fetch_cross_referenced_chunks(&refs, &store, 2);

        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"s1"));
        assert!(ids.contains(&"c1"));
        assert!(!ids.contains(&"other"));
    }

    #[test]
    fn test_fetch_skips_superseded() {
        let store = EmbeddedStore::with_dimension(4);
        store
            .upsert(vec![
                record("old", &["940.01"], &[], true),
                record("new", &["940.01"], &[], false),
            ])
            .unwrap();

        let chunks = fetch_cross_referenced_chunks(&["940.01".to_string()], &store, 2);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "new");
    }

    #[test]
    fn test_fetch_caps_per_reference() {
        let store = EmbeddedStore::with_dimension(4);
        store
            .upsert(vec![
                record("a", &["940.01"], &[], false),
                record("b", &["940.01"], &[], false),
                record("c", &["940.01"], &[], false),
            ])
            .unwrap();

        let chunks = fetch_cross_referenced_chunks(&["940.01".to_string()], &store, 2);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_fetch_empty_refs() {
        let store = EmbeddedStore::with_dimension(4);
        assert!(fetch_cross_referenced_chunks(&[], &store, 2).is_empty());
    }
}
