//! The vectorizer module
//! Builds the vocabulary and IDF weights once, then projects text into that space

use crate::error::{EngineError, Result};
use crate::vector::SparseVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Lower-cases `text` and splits it on every non-alphanumeric character.
///
/// Fit and transform share this function, so both sides of a comparison see
/// the same terms.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Smoothed inverse document frequency: `ln((1 + n) / (1 + df)) + 1`.
pub fn smoothed_idf(n_docs: usize, doc_freq: usize) -> f32 {
    (((1 + n_docs) as f64 / (1 + doc_freq) as f64).ln() + 1.0) as f32
}

/// Fixed vocabulary plus one IDF weight per column.
///
/// Immutable after [`Vectorizer::fit`]: transform never adds terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VocabularyWeights", into = "VocabularyWeights")]
pub struct Vectorizer {
    /// Column index -> term, in first-seen order
    terms: Vec<String>,
    /// Term -> column index
    vocabulary: HashMap<String, u32>,
    /// IDF weight per column
    idf: Vec<f32>,
}

/// Persisted shape of a [`Vectorizer`]; the lookup map is rebuilt from `terms`.
#[derive(Serialize, Deserialize)]
struct VocabularyWeights {
    terms: Vec<String>,
    idf: Vec<f32>,
}

impl From<VocabularyWeights> for Vectorizer {
    fn from(data: VocabularyWeights) -> Self {
        let vocabulary = data.terms.iter()
            .enumerate()
            .map(|(col, term)| (term.clone(), col as u32))
            .collect();
        Vectorizer { terms: data.terms, vocabulary, idf: data.idf }
    }
}

impl From<Vectorizer> for VocabularyWeights {
    fn from(vectorizer: Vectorizer) -> Self {
        VocabularyWeights { terms: vectorizer.terms, idf: vectorizer.idf }
    }
}

impl Vectorizer {
    /// Builds vocabulary and IDF weights from `documents`.
    ///
    /// Empty texts are ignored. Fails with `EmptyCorpus` when nothing usable
    /// remains, including the case where no text yields a single term.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Vectorizer> {
        let mut terms: Vec<String> = Vec::new();
        let mut vocabulary: HashMap<String, u32> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        let mut n_docs = 0;

        for doc in documents {
            let doc: &str = doc.as_ref();
            if doc.is_empty() {
                continue;
            }
            n_docs += 1;
            let mut seen: HashSet<u32> = HashSet::new();
            for token in tokenize(doc) {
                let col = match vocabulary.get(&token) {
                    Some(&col) => col,
                    None => {
                        let col = terms.len() as u32;
                        vocabulary.insert(token.clone(), col);
                        terms.push(token);
                        doc_freq.push(0);
                        col
                    }
                };
                if seen.insert(col) {
                    doc_freq[col as usize] += 1;
                }
            }
        }

        if n_docs == 0 || terms.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let idf = doc_freq.iter()
            .map(|&df| smoothed_idf(n_docs, df))
            .collect();

        tracing::debug!(documents = n_docs, terms = terms.len(), "fitted vocabulary");
        Ok(Vectorizer { terms, vocabulary, idf })
    }

    /// Projects `text` onto the fitted vocabulary: raw term counts times IDF,
    /// then L2-normalized. Unknown terms are dropped; a text without any known
    /// term gives the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&col) = self.vocabulary.get(&token) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }

        let entries = counts.into_iter()
            .map(|(col, tf)| (col, tf as f32 * self.idf[col as usize]))
            .collect();
        let mut vector = SparseVector::from_entries(entries);
        vector.normalize();
        vector
    }

    /// Vocabulary cardinality.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term(&self, column: u32) -> Option<&str> {
        self.terms.get(column as usize).map(String::as_str)
    }

    pub fn column(&self, term: &str) -> Option<u32> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.column(term).map(|col| self.idf[col as usize])
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Checks that the decoded weights line up with the terms.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.terms.len() != self.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but {} weights",
                self.terms.len(),
                self.idf.len()
            ));
        }
        if self.vocabulary.len() != self.terms.len() {
            return Err("vocabulary contains duplicate terms".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod vectorizer_test {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        let tokens: Vec<String> = tokenize("Hello, World! it's 2024 zzqq_unknown").collect();
        assert_eq!(tokens, vec!["hello", "world", "it", "s", "2024", "zzqq", "unknown"]);
    }

    #[test]
    fn test_fit_first_seen_order() {
        let v = Vectorizer::fit(&["b a", "c a"]).unwrap();
        assert_eq!(v.terms(), &["b", "a", "c"]);
        assert_eq!(v.column("c"), Some(2));
        assert_eq!(v.term(1), Some("a"));
    }

    #[test]
    fn test_idf_formula() {
        // N = 2, df(a) = 2, df(b) = 1
        let v = Vectorizer::fit(&["a b", "a"]).unwrap();
        let idf_a = v.idf("a").unwrap();
        let idf_b = v.idf("b").unwrap();

        assert!((idf_a - 1.0).abs() < 1e-6);
        assert!((idf_b - ((3.0f32 / 2.0).ln() + 1.0)).abs() < 1e-6);
        assert!(idf_b > idf_a);
    }

    #[test]
    fn test_fit_skips_empty_texts() {
        let v = Vectorizer::fit(&["", "one two", ""]).unwrap();
        // Only one usable document, so every term has df = N = 1
        assert!((v.idf("one").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_empty_corpus() {
        let empty: [&str; 0] = [];
        assert!(matches!(Vectorizer::fit(&empty), Err(EngineError::EmptyCorpus)));
        assert!(matches!(Vectorizer::fit(&["", ""]), Err(EngineError::EmptyCorpus)));
        assert!(matches!(Vectorizer::fit(&["?!", "..."]), Err(EngineError::EmptyCorpus)));
    }

    #[test]
    fn test_transform_is_normalized() {
        let v = Vectorizer::fit(&["the cat sat", "the dog ran", "a cat ran"]).unwrap();
        let vec = v.transform("The cat ran and ran");

        assert!((vec.as_row().norm() - 1.0).abs() < 1e-5);
        assert!(vec.get(v.column("ran").unwrap()) > vec.get(v.column("cat").unwrap()));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let v = Vectorizer::fit(&["alpha beta gamma", "beta delta"]).unwrap();
        assert_eq!(v.transform("beta gamma beta"), v.transform("beta gamma beta"));
    }

    #[test]
    fn test_transform_out_of_vocabulary() {
        let v = Vectorizer::fit(&["known words only"]).unwrap();
        let vec = v.transform("zzqq_unknown_term");

        assert!(vec.is_zero());
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_transform_does_not_grow_vocabulary() {
        let v = Vectorizer::fit(&["one two"]).unwrap();
        let before = v.clone();
        let _ = v.transform("one three four");
        assert_eq!(v, before);
    }

    #[test]
    fn test_serde_rebuilds_lookup() {
        let v = Vectorizer::fit(&["x y z", "y z"]).unwrap();
        let bytes = bincode::serialize(&v).unwrap();
        let decoded: Vectorizer = bincode::deserialize(&bytes).unwrap();

        assert_eq!(decoded, v);
        assert_eq!(decoded.column("z"), Some(2));
        assert!(decoded.validate().is_ok());
    }
}
