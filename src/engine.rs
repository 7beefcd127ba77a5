//! The similarity engine module
//! Ties vectorizer, document matrix and id sequence to a persistence store

use crate::error::{EngineError, Result};
use crate::matrix::DocumentMatrix;
use crate::store::{BlobName, BlobStore};
use crate::vector::SparseVector;
use crate::vectorizer::Vectorizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Caller supplied document identifier.
///
/// Integers and strings are both accepted; in JSON they appear as bare
/// numbers or strings. An empty string counts as a missing id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    Int(i64),
    Text(String),
}

impl DocId {
    pub fn is_empty(&self) -> bool {
        matches!(self, DocId::Text(s) if s.is_empty())
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Int(n) => write!(f, "{}", n),
            DocId::Text(s) => f.write_str(s),
        }
    }
}

/// Integers parse as `Int`, anything else is kept as `Text`.
impl FromStr for DocId {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => DocId::Int(n),
            Err(_) => DocId::Text(s.to_string()),
        })
    }
}

impl From<i64> for DocId {
    fn from(n: i64) -> Self {
        DocId::Int(n)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId::Text(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        DocId::Text(s)
    }
}

/// An indexed document matched by a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: DocId,
    /// Row in the document matrix
    pub row: usize,
    /// Cosine similarity with the query
    pub score: f32,
}

/// Similarity engine over one persisted index.
///
/// State is loaded eagerly by [`open`](SimilarityEngine::open) and every
/// mutation writes the affected blobs back before returning, so an instance
/// is meant to live for a single call. Nothing here serializes concurrent
/// writers; wrap the store in a [`SharedIndex`](crate::SharedIndex) for that.
///
/// If a save fails the in-memory state may be ahead of the store; drop the
/// instance and open a new one.
pub struct SimilarityEngine<S: BlobStore> {
    store: S,
    vectorizer: Option<Vectorizer>,
    matrix: DocumentMatrix,
    ids: Vec<DocId>,
}

impl<S: BlobStore> SimilarityEngine<S> {
    /// Loads the index from `store`.
    ///
    /// No blobs at all is an empty, unfitted index. Any other combination of
    /// missing blobs, an undecodable blob, or blobs that disagree on their
    /// dimensions is reported as `CorruptState` and never repaired.
    ///
    /// # Examples
    ///
    /// ```
    /// use similtext::{MemoryStore, SimilarityEngine};
    ///
    /// let engine = SimilarityEngine::open(MemoryStore::new()).unwrap();
    /// assert!(!engine.is_fitted());
    /// assert!(engine.list_ids().is_empty());
    /// ```
    pub fn open(store: S) -> Result<Self> {
        let vocabulary = read_blob(&store, BlobName::VocabularyWeights)?;
        let matrix = read_blob(&store, BlobName::Matrix)?;
        let ids = read_blob(&store, BlobName::Ids)?;

        let (vectorizer, matrix, ids) = match (vocabulary, matrix, ids) {
            (None, None, None) => {
                tracing::debug!("no persisted index, starting empty");
                return Ok(SimilarityEngine {
                    store,
                    vectorizer: None,
                    matrix: DocumentMatrix::new(0),
                    ids: Vec::new(),
                });
            }
            (Some(vocabulary), Some(matrix), Some(ids)) => (
                decode_bincode::<Vectorizer>(BlobName::VocabularyWeights, &vocabulary)?,
                decode_bincode::<DocumentMatrix>(BlobName::Matrix, &matrix)?,
                decode_ids(&ids)?,
            ),
            (vocabulary, matrix, ids) => {
                let missing: Vec<&str> = [
                    (BlobName::VocabularyWeights, vocabulary.is_none()),
                    (BlobName::Matrix, matrix.is_none()),
                    (BlobName::Ids, ids.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name.as_str())
                .collect();
                return Err(corrupt(format!("missing blob(s): {}", missing.join(", "))));
            }
        };

        vectorizer.validate().map_err(corrupt)?;
        matrix.validate().map_err(corrupt)?;
        if matrix.columns() != vectorizer.len() {
            return Err(corrupt(format!(
                "matrix has {} columns but the vocabulary has {} terms",
                matrix.columns(),
                vectorizer.len()
            )));
        }
        if matrix.rows() != ids.len() {
            return Err(corrupt(format!(
                "matrix has {} rows but there are {} ids",
                matrix.rows(),
                ids.len()
            )));
        }

        tracing::debug!(terms = vectorizer.len(), documents = ids.len(), "loaded index");
        Ok(SimilarityEngine { store, vectorizer: Some(vectorizer), matrix, ids })
    }

    /// Replaces the whole index with `documents`.
    ///
    /// Pairs with an empty id or empty text are skipped. The vocabulary and
    /// IDF weights are fitted on the remaining texts, every text becomes one
    /// row, and all three blobs are written. Returns the number of indexed
    /// documents.
    ///
    /// Fails with `EmptyCorpus`, leaving store and engine untouched, when no
    /// usable document remains.
    ///
    /// # Examples
    ///
    /// ```
    /// use similtext::{DocId, MemoryStore, SimilarityEngine};
    ///
    /// let mut engine = SimilarityEngine::open(MemoryStore::new()).unwrap();
    /// let indexed = engine.rebuild(vec![
    ///     (DocId::Int(1), "The first document"),
    ///     (DocId::Int(2), ""),
    ///     (DocId::Int(3), "The third document"),
    /// ]).unwrap();
    ///
    /// assert_eq!(indexed, 2);
    /// assert_eq!(engine.list_ids(), &[DocId::Int(1), DocId::Int(3)]);
    /// ```
    pub fn rebuild<I, T>(&mut self, documents: I) -> Result<usize>
    where
        I: IntoIterator<Item = (DocId, T)>,
        T: AsRef<str>,
    {
        let usable: Vec<(DocId, T)> = documents.into_iter()
            .filter(|(id, text)| !id.is_empty() && !text.as_ref().is_empty())
            .collect();
        let texts: Vec<&str> = usable.iter().map(|(_, text)| text.as_ref()).collect();

        let vectorizer = match Vectorizer::fit(&texts) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("rebuild rejected: {}", e);
                return Err(e);
            }
        };

        let mut matrix = DocumentMatrix::new(vectorizer.len());
        for text in &texts {
            matrix.push_row(&vectorizer.transform(text))?;
        }
        let ids: Vec<DocId> = usable.iter().map(|(id, _)| id.clone()).collect();

        self.write_blob(BlobName::VocabularyWeights, encode_bincode(BlobName::VocabularyWeights, &vectorizer)?)?;
        self.write_blob(BlobName::Matrix, encode_bincode(BlobName::Matrix, &matrix)?)?;
        self.write_blob(BlobName::Ids, encode_ids(&ids)?)?;

        tracing::info!(documents = ids.len(), terms = vectorizer.len(), "rebuilt index");
        self.vectorizer = Some(vectorizer);
        self.matrix = matrix;
        self.ids = ids;
        Ok(self.ids.len())
    }

    /// Appends an already transformed vector as a new row with `id`, then
    /// persists matrix and ids together.
    ///
    /// The row is stored L2-normalized whatever the scale of `vector`. The
    /// vocabulary is never extended. Fails with `NotFitted` before the first
    /// rebuild and with `EmptyInput` for an empty id.
    pub fn append(&mut self, id: DocId, mut vector: SparseVector) -> Result<()> {
        if self.vectorizer.is_none() {
            return Err(EngineError::NotFitted);
        }
        if id.is_empty() {
            return Err(EngineError::EmptyInput);
        }

        vector.normalize();
        self.matrix.push_row(&vector)?;
        self.ids.push(id);

        self.write_blob(BlobName::Matrix, encode_bincode(BlobName::Matrix, &self.matrix)?)?;
        self.write_blob(BlobName::Ids, encode_ids(&self.ids)?)?;

        tracing::debug!(documents = self.ids.len(), "appended document");
        Ok(())
    }

    /// Transforms `text` with the fitted vocabulary and appends it under `id`.
    pub fn index_document(&mut self, id: DocId, text: &str) -> Result<()> {
        if id.is_empty() || text.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        let vector = match &self.vectorizer {
            Some(vectorizer) => vectorizer.transform(text),
            None => return Err(EngineError::NotFitted),
        };
        self.append(id, vector)
    }

    /// Query-and-index: finds the indexed document most similar to `text`
    /// and, when there is one, indexes `text` under `id`.
    ///
    /// This is not a pure read. A successful match appends a row and
    /// rewrites the matrix and id blobs before returning.
    ///
    /// Returns `None` without indexing when the index is empty or unfitted,
    /// or when the best similarity is zero. Ties go to the earliest row.
    ///
    /// # Examples
    ///
    /// ```
    /// use similtext::{DocId, MemoryStore, SimilarityEngine};
    ///
    /// let mut engine = SimilarityEngine::open(MemoryStore::new()).unwrap();
    /// engine.rebuild(vec![(DocId::Int(1), "a b c")]).unwrap();
    ///
    /// let found = engine.query_and_index(DocId::Int(2), "a b c").unwrap();
    /// assert_eq!(found.unwrap().id, DocId::Int(1));
    /// assert_eq!(engine.list_ids(), &[DocId::Int(1), DocId::Int(2)]);
    /// ```
    pub fn query_and_index(&mut self, id: DocId, text: &str) -> Result<Option<Match>> {
        if id.is_empty() || text.is_empty() {
            tracing::warn!(id = %id, "query rejected, empty id or text");
            return Err(EngineError::EmptyInput);
        }

        let query = match &self.vectorizer {
            Some(vectorizer) => vectorizer.transform(text),
            None => {
                tracing::debug!("index not fitted, no match possible");
                return Ok(None);
            }
        };

        let (row, score) = match self.matrix.best_match(query.as_row()) {
            Some(best) if best.1 > 0.0 => best,
            _ => {
                tracing::info!(id = %id, "no similar document");
                return Ok(None);
            }
        };

        let matched = Match { id: self.ids[row].clone(), row, score };
        tracing::info!(id = %id, similar = %matched.id, score, "found similar document");

        self.append(id, query)?;
        Ok(Some(matched))
    }

    /// Ranks indexed documents against `text` without changing anything.
    ///
    /// At most `top_k` matches with a positive score, best first.
    pub fn rank(&self, text: &str, top_k: usize) -> Result<Vec<Match>> {
        if text.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        let Some(vectorizer) = &self.vectorizer else {
            return Ok(Vec::new());
        };

        let query = vectorizer.transform(text);
        let matches = self.matrix.top_k(query.as_row(), top_k)
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(row, score)| Match { id: self.ids[row].clone(), row, score })
            .collect();
        Ok(matches)
    }

    /// Term weights of the first document indexed under `id`.
    ///
    /// Only terms with a strictly positive weight are returned. `None` when
    /// the id is unknown.
    pub fn scores_for(&self, id: &DocId) -> Option<BTreeMap<String, f32>> {
        let vectorizer = self.vectorizer.as_ref()?;
        let row = self.ids.iter().position(|x| x == id)?;

        let scores = self.matrix.row(row)
            .iter()
            .filter(|(_, weight)| *weight > 0.0)
            .filter_map(|(col, weight)| vectorizer.term(col).map(|term| (term.to_string(), weight)))
            .collect();
        Some(scores)
    }

    /// Document ids in row order.
    pub fn list_ids(&self) -> &[DocId] {
        &self.ids
    }

    /// Returns the number of indexed documents.
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.vectorizer.is_some()
    }

    pub fn vectorizer(&self) -> Option<&Vectorizer> {
        self.vectorizer.as_ref()
    }

    pub fn matrix(&self) -> &DocumentMatrix {
        &self.matrix
    }

    fn write_blob(&self, name: BlobName, bytes: Vec<u8>) -> Result<()> {
        self.store
            .save(name, &bytes)
            .map_err(|source| EngineError::StorageFailure { blob: name, source })
    }
}

fn corrupt(message: String) -> EngineError {
    tracing::warn!("corrupt index state: {}", message);
    EngineError::CorruptState(message)
}

fn read_blob<S: BlobStore>(store: &S, name: BlobName) -> Result<Option<Vec<u8>>> {
    store
        .load(name)
        .map_err(|source| EngineError::StorageFailure { blob: name, source })
}

fn encode_bincode<T: Serialize>(name: BlobName, value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| EngineError::StorageFailure {
        blob: name,
        source: std::io::Error::other(e.to_string()),
    })
}

fn decode_bincode<T: serde::de::DeserializeOwned>(name: BlobName, bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| corrupt(format!("cannot decode {} blob: {}", name, e)))
}

fn encode_ids(ids: &[DocId]) -> Result<Vec<u8>> {
    serde_json::to_vec(ids).map_err(|e| EngineError::StorageFailure {
        blob: BlobName::Ids,
        source: std::io::Error::other(e.to_string()),
    })
}

fn decode_ids(bytes: &[u8]) -> Result<Vec<DocId>> {
    serde_json::from_slice(bytes).map_err(|e| corrupt(format!("cannot decode ids blob: {}", e)))
}
