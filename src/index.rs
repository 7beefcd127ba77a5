//! Single-writer access to a persisted index.
//!
//! Every call opens a fresh [`SimilarityEngine`] from the store, so the store
//! stays the only source of truth. Mutations hold the write lock for their
//! whole load-mutate-save sequence, which keeps concurrent rebuilds, appends
//! and queries from interleaving inside this process. Other processes writing
//! the same directory are not coordinated.

use crate::engine::{DocId, Match, SimilarityEngine};
use crate::error::Result;
use crate::store::BlobStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

pub struct SharedIndex<S> {
    store: RwLock<S>,
}

impl<S: BlobStore> SharedIndex<S> {
    pub fn new(store: S) -> SharedIndex<S> {
        SharedIndex { store: RwLock::new(store) }
    }

    /// Runs `op` against a freshly loaded engine under the read lock.
    pub fn read<T>(&self, op: impl FnOnce(&SimilarityEngine<&S>) -> Result<T>) -> Result<T> {
        let store = self.store.read();
        let engine = SimilarityEngine::open(&*store)?;
        op(&engine)
    }

    /// Runs `op` against a freshly loaded engine under the write lock.
    pub fn write<T>(&self, op: impl FnOnce(&mut SimilarityEngine<&S>) -> Result<T>) -> Result<T> {
        let store = self.store.write();
        let mut engine = SimilarityEngine::open(&*store)?;
        op(&mut engine)
    }

    /// Rebuilds the index and returns the ids now indexed.
    pub fn rebuild(&self, documents: Vec<(DocId, String)>) -> Result<Vec<DocId>> {
        self.write(|engine| {
            engine.rebuild(documents)?;
            Ok(engine.list_ids().to_vec())
        })
    }

    /// See [`SimilarityEngine::query_and_index`]; this indexes on a match.
    pub fn query_and_index(&self, id: DocId, text: &str) -> Result<Option<Match>> {
        self.write(|engine| engine.query_and_index(id, text))
    }

    pub fn index_document(&self, id: DocId, text: &str) -> Result<()> {
        self.write(|engine| engine.index_document(id, text))
    }

    pub fn scores_for(&self, id: &DocId) -> Result<Option<BTreeMap<String, f32>>> {
        self.read(|engine| Ok(engine.scores_for(id)))
    }

    pub fn rank(&self, text: &str, top_k: usize) -> Result<Vec<Match>> {
        self.read(|engine| engine.rank(text, top_k))
    }

    pub fn list_ids(&self) -> Result<Vec<DocId>> {
        self.read(|engine| Ok(engine.list_ids().to_vec()))
    }
}

#[cfg(test)]
mod index_test {
    use super::*;
    use crate::error::EngineError;
    use crate::store::{DirStore, MemoryStore};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_operations_go_through_store() {
        let index = SharedIndex::new(MemoryStore::new());
        assert!(index.list_ids().unwrap().is_empty());

        let ids = index.rebuild(vec![(DocId::Int(1), "cat cat dog".to_string())]).unwrap();
        assert_eq!(ids, vec![DocId::Int(1)]);

        let found = index.query_and_index(DocId::Int(2), "dog and cat").unwrap();
        assert_eq!(found.unwrap().id, DocId::Int(1));
        assert_eq!(index.list_ids().unwrap(), vec![DocId::Int(1), DocId::Int(2)]);

        let scores = index.scores_for(&DocId::Int(1)).unwrap().unwrap();
        assert!(scores["cat"] > scores["dog"]);
    }

    #[test]
    fn test_errors_pass_through() {
        let index = SharedIndex::new(MemoryStore::new());
        let result = index.rebuild(vec![(DocId::Int(1), String::new())]);
        assert!(matches!(result, Err(EngineError::EmptyCorpus)));
        assert!(matches!(index.index_document(DocId::Int(1), "text"), Err(EngineError::NotFitted)));
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_appends() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(SharedIndex::new(DirStore::new(dir.path())));
        index.rebuild(vec![(DocId::Int(0), "shared topic words".to_string())]).unwrap();

        let threads = 8;
        let per_thread = 10;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        let id = DocId::Int((t * per_thread + i + 1) as i64);
                        let found = index.query_and_index(id, "shared topic").unwrap();
                        assert!(found.is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let ids = index.list_ids().unwrap();
        assert_eq!(ids.len(), 1 + threads * per_thread);
        index.read(|engine| {
            assert_eq!(engine.matrix().rows(), ids.len());
            Ok(())
        }).unwrap();
    }
}
