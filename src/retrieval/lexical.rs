//! Lazily built, invalidatable BM25 lexical index
//!
//! The index is a snapshot over every document in the store, built on
//! first use and invalidated as a unit after re-ingestion. Readers see
//! either the fully old or fully new index, never a partial build.

use crate::store::{StoreEntry, StoreError, VectorStore};
use ahash::{HashMap, HashMapExt};
use std::sync::Arc;
use tokio::sync::RwLock;

const K1: f64 = 1.2;
const B: f64 = 0.75;

/// Lowercase + whitespace-split tokenization, shared by indexing and
/// query scoring.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

struct IndexedDoc {
    id: String,
    document: String,
    metadata: crate::ingest::metadata::ChunkMetadata,
    term_freq: HashMap<String, usize>,
    len: usize,
}

/// Immutable BM25 index over a store snapshot.
pub struct LexicalIndex {
    docs: Vec<IndexedDoc>,
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f64,
}

impl LexicalIndex {
    /// Build from all documents currently in the store. An empty store
    /// produces an empty index that scores nothing.
    pub fn build(entries: Vec<StoreEntry>) -> Self {
        let mut docs: Vec<IndexedDoc> = Vec::with_capacity(entries.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        for entry in entries {
            let tokens = tokenize(&entry.document);
            let len = tokens.len();
            total_len += len;

            let mut term_freq: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *term_freq.entry(token).or_insert(0) += 1;
            }
            for term in term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }

            docs.push(IndexedDoc {
                id: entry.id,
                document: entry.document,
                metadata: entry.metadata,
                term_freq,
                len,
            });
        }

        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };

        tracing::info!("Lexical index built with {} documents", docs.len());

        Self {
            docs,
            doc_freq,
            avg_doc_len,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn bm25_score(&self, doc: &IndexedDoc, query_terms: &[String]) -> f64 {
        let n = self.docs.len() as f64;
        let mut score = 0.0;

        for term in query_terms {
            let tf = match doc.term_freq.get(term) {
                Some(&tf) => tf as f64,
                None => continue,
            };
            let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
            // Lucene-style non-negative idf
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
            let norm = 1.0 - B + B * (doc.len as f64 / self.avg_doc_len);
            score += idf * tf * (K1 + 1.0) / (tf + K1 * norm);
        }

        score
    }

    /// Score a query against every indexed document and return the top
    /// `n` entries with positive scores, best first.
    pub fn top_n(&self, query: &str, n: usize) -> Vec<(StoreEntry, f64)> {
        if self.docs.is_empty() {
            return Vec::new();
        }

        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .docs
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, self.bm25_score(doc, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.docs[a.0].id.cmp(&self.docs[b.0].id))
        });
        scored.truncate(n);

        scored
            .into_iter()
            .map(|(i, score)| {
                let doc = &self.docs[i];
                (
                    StoreEntry {
                        id: doc.id.clone(),
                        document: doc.document.clone(),
                        metadata: doc.metadata.clone(),
                    },
                    score,
                )
            })
            .collect()
    }
}

/// Owned handle around the lazily built index.
///
/// Single-writer/many-readers: `get_or_build` hands out a shared
/// snapshot, `invalidate` drops it as a unit so the next query rebuilds
/// from the store.
pub struct LexicalHandle {
    inner: RwLock<Option<Arc<LexicalIndex>>>,
}

impl LexicalHandle {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Return the current index, building it from the store on first
    /// use (or after invalidation).
    pub async fn get_or_build(
        &self,
        store: &dyn VectorStore,
    ) -> Result<Arc<LexicalIndex>, StoreError> {
        {
            let guard = self.inner.read().await;
            if let Some(index) = guard.as_ref() {
                return Ok(Arc::clone(index));
            }
        }

        let mut guard = self.inner.write().await;
        // Another writer may have built it while we waited
        if let Some(index) = guard.as_ref() {
            return Ok(Arc::clone(index));
        }

        tracing::info!("Building lexical index from document store...");
        let entries = store.get_all()?;
        let index = Arc::new(LexicalIndex::build(entries));
        *guard = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Drop the cached index. Call after re-ingestion.
    pub async fn invalidate(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
        tracing::info!("Lexical index invalidated");
    }
}

impl Default for LexicalHandle {
    fn default() -> Self {
        Self::new()
    }
}
