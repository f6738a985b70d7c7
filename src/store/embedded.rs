//! Embedded HNSW-backed vector store
//!
//! In-process implementation of [`VectorStore`]: an id-keyed record map
//! plus a cosine HNSW index. The HNSW graph cannot remove points, so
//! upserting an existing id tombstones its old internal slot and
//! inserts the new embedding under a fresh one; queries over-fetch and
//! skip tombstones.

use super::{MetadataFilter, StoreEntry, StoreError, StoreRecord, VectorStore};
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use hnsw_rs::prelude::*;
use std::sync::RwLock;

struct RecordSlot {
    document: String,
    metadata: crate::ingest::metadata::ChunkMetadata,
    internal_id: usize,
}

struct StoreInner {
    index: Hnsw<'static, f32, DistCosine>,
    records: HashMap<String, RecordSlot>,
    internal_to_id: HashMap<usize, String>,
    tombstones: HashSet<usize>,
    next_internal: usize,
}

/// In-process store with cosine similarity search.
pub struct EmbeddedStore {
    inner: RwLock<StoreInner>,
    dimension: usize,
    capacity: usize,
    ef_search: usize,
}

impl EmbeddedStore {
    pub fn new(dimension: usize, capacity: usize, ef_construction: usize, m: usize, ef_search: usize) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(m, capacity, 16, ef_construction, DistCosine);
        Self {
            inner: RwLock::new(StoreInner {
                index,
                records: HashMap::new(),
                internal_to_id: HashMap::new(),
                tombstones: HashSet::new(),
                next_internal: 0,
            }),
            dimension,
            capacity,
            ef_search,
        }
    }

    /// Store with defaults suitable for tests and small corpora.
    pub fn with_dimension(dimension: usize) -> Self {
        Self::new(dimension, 10_000, 200, 16, 50)
    }

    fn entry_for(slot: &RecordSlot, id: &str) -> StoreEntry {
        StoreEntry {
            id: id.to_string(),
            document: slot.document.clone(),
            metadata: slot.metadata.clone(),
        }
    }
}

impl VectorStore for EmbeddedStore {
    fn upsert(&self, records: Vec<StoreRecord>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| {
            StoreError::Unavailable("store lock poisoned".to_string())
        })?;

        for record in records {
            if record.embedding.len() != self.dimension {
                return Err(StoreError::InvalidDimension {
                    expected: self.dimension,
                    actual: record.embedding.len(),
                });
            }
            if inner.next_internal >= self.capacity {
                return Err(StoreError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }

            // Replacing an existing id: retire its old vector slot
            let replaced = inner.records.get(&record.id).map(|slot| slot.internal_id);
            if let Some(old_internal) = replaced {
                inner.tombstones.insert(old_internal);
                inner.internal_to_id.remove(&old_internal);
            }

            let internal_id = inner.next_internal;
            inner.next_internal += 1;

            inner.index.insert((&record.embedding, internal_id));
            inner.internal_to_id.insert(internal_id, record.id.clone());
            inner.records.insert(
                record.id,
                RecordSlot {
                    document: record.document,
                    metadata: record.metadata,
                    internal_id,
                },
            );
        }

        Ok(())
    }

    fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<StoreEntry>, StoreError> {
        if embedding.len() != self.dimension {
            return Err(StoreError::InvalidDimension {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let inner = self.inner.read().map_err(|_| {
            StoreError::Unavailable("store lock poisoned".to_string())
        })?;

        if inner.records.is_empty() {
            return Ok(Vec::new());
        }

        // Over-fetch to cover tombstoned slots from prior upserts
        let fetch = n_results + inner.tombstones.len();
        let neighbours = inner.index.search(embedding, fetch, self.ef_search);

        let mut entries: Vec<StoreEntry> = Vec::new();
        for neighbour in neighbours {
            if inner.tombstones.contains(&neighbour.d_id) {
                continue;
            }
            if let Some(id) = inner.internal_to_id.get(&neighbour.d_id) {
                if let Some(slot) = inner.records.get(id) {
                    entries.push(Self::entry_for(slot, id));
                }
            }
            if entries.len() >= n_results {
                break;
            }
        }

        Ok(entries)
    }

    fn get_where(&self, filter: &MetadataFilter) -> Result<Vec<StoreEntry>, StoreError> {
        let inner = self.inner.read().map_err(|_| {
            StoreError::Unavailable("store lock poisoned".to_string())
        })?;

        let mut entries: Vec<StoreEntry> = inner
            .records
            .iter()
            .filter(|(_, slot)| filter.matches(&slot.metadata))
            .map(|(id, slot)| Self::entry_for(slot, id))
            .collect();
        // Map iteration order is arbitrary; return a stable ordering
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(entries)
    }

    fn get_all(&self) -> Result<Vec<StoreEntry>, StoreError> {
        let inner = self.inner.read().map_err(|_| {
            StoreError::Unavailable("store lock poisoned".to_string())
        })?;

        let mut entries: Vec<StoreEntry> = inner
            .records
            .iter()
            .map(|(id, slot)| Self::entry_for(slot, id))
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(entries)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| {
            StoreError::Unavailable("store lock poisoned".to_string())
        })?;
        Ok(inner.records.len())
    }

    fn set_superseded(&self, doc_id: &str, superseded: bool) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(|_| {
            StoreError::Unavailable("store lock poisoned".to_string())
        })?;

        match inner.records.get_mut(doc_id) {
            Some(slot) => {
                slot.metadata.superseded = superseded;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::metadata::{ChunkMetadata, Jurisdiction, SourceType};
    use crate::store::MetadataField;

    fn meta(doc_id: &str, statutes: &[&str]) -> ChunkMetadata {
        ChunkMetadata {
            doc_id: doc_id.to_string(),
            source_type: SourceType::Statute,
            jurisdiction: Jurisdiction::State,
            superseded: false,
            title: "ch943".to_string(),
            source_file: "/data/statutes/ch943.txt".to_string(),
            chunk_index: 0,
            start_page: 1,
            end_page: 1,
            context_header: "Chapter 943".to_string(),
            statute_numbers: statutes.iter().map(|s| s.to_string()).collect(),
            case_citations: vec![],
            chapter_numbers: vec!["943".to_string()],
            token_count: 10,
        }
    }

    fn record(id: &str, embedding: Vec<f32>, statutes: &[&str]) -> StoreRecord {
        StoreRecord {
            id: id.to_string(),
            document: format!("document {}", id),
            embedding,
            metadata: meta(id, statutes),
        }
    }

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn test_upsert_and_count() {
        let store = EmbeddedStore::with_dimension(8);
        store
            .upsert(vec![
                record("a", unit(8, 0), &["943.01"]),
                record("b", unit(8, 1), &["940.01"]),
            ])
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_upsert_same_id_replaces() {
        let store = EmbeddedStore::with_dimension(8);
        store.upsert(vec![record("a", unit(8, 0), &["943.01"])]).unwrap();
        store.upsert(vec![record("a", unit(8, 1), &["940.01"])]).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let all = store.get_all().unwrap();
        assert_eq!(all[0].metadata.statute_numbers, vec!["940.01"]);

        // The replaced vector must not come back from queries
        let results = store.query(&unit(8, 1), 2).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
    }

    #[test]
    fn test_query_ranks_by_similarity() {
        let store = EmbeddedStore::with_dimension(8);
        store
            .upsert(vec![
                record("a", unit(8, 0), &[]),
                record("b", unit(8, 1), &[]),
                record("c", vec![0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], &[]),
            ])
            .unwrap();

        let results = store.query(&unit(8, 0), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[1].id, "c");
    }

    #[test]
    fn test_query_empty_store() {
        let store = EmbeddedStore::with_dimension(8);
        assert!(store.query(&unit(8, 0), 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let store = EmbeddedStore::with_dimension(8);
        let result = store.query(&[1.0, 0.0], 5);
        assert!(matches!(result, Err(StoreError::InvalidDimension { .. })));
    }

    #[test]
    fn test_get_where_contains() {
        let store = EmbeddedStore::with_dimension(8);
        store
            .upsert(vec![
                record("a", unit(8, 0), &["943.01", "943.02"]),
                record("b", unit(8, 1), &["940.01"]),
            ])
            .unwrap();

        let filter = MetadataFilter::contains(MetadataField::StatuteNumbers, "943.01");
        let hits = store.get_where(&filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[test]
    fn test_set_superseded() {
        let store = EmbeddedStore::with_dimension(8);
        store.upsert(vec![record("a", unit(8, 0), &[])]).unwrap();

        assert!(store.set_superseded("a", true).unwrap());
        assert!(store.get_all().unwrap()[0].metadata.superseded);
        assert!(!store.set_superseded("missing", true).unwrap());
    }
}
