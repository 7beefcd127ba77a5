//! # similtext - Text Similarity Index
//!
//! similtext indexes short text documents as TF-IDF vectors and answers two
//! questions: which indexed document is most similar to a new text, and which
//! terms dominate a given document.
//!
//! The vocabulary and IDF weights are fitted once by a rebuild. Later texts are
//! projected onto that fixed vocabulary, L2-normalized, and compared with a dot
//! product (cosine similarity for normalized vectors). Vocabulary, document
//! matrix and id sequence are persisted as three blobs in a [`BlobStore`].
//!
//! ## Example
//!
//! ```
//! use similtext::{DocId, MemoryStore, SimilarityEngine};
//!
//! let mut engine = SimilarityEngine::open(MemoryStore::new()).unwrap();
//! engine.rebuild(vec![
//!     (DocId::Int(1), "The council approved the new budget"),
//!     (DocId::Int(2), "Local team wins the championship"),
//! ]).unwrap();
//!
//! // Querying also indexes the text under the new id
//! let found = engine.query_and_index(DocId::Int(3), "Budget approved by the council").unwrap();
//! assert_eq!(found.unwrap().id, DocId::Int(1));
//! assert_eq!(engine.count(), 3);
//! ```

pub mod config;
pub mod error;
pub mod matrix;
pub mod server;
pub mod store;
pub mod vector;
pub mod vectorizer;
mod engine;
mod index;

// Re-export the engine types as the primary public API
pub use engine::{DocId, Match, SimilarityEngine};
pub use error::{EngineError, Result};
pub use index::SharedIndex;
pub use store::{BlobName, BlobStore, DirStore, MemoryStore};
pub use vectorizer::Vectorizer;
