//! The document matrix module
//! One sparse row per indexed document, stored as flat CSR arrays

use crate::error::{EngineError, Result};
use crate::vector::{SparseRow, SparseVector, dot_product};
use serde::{Deserialize, Serialize};

/// Row-major sparse matrix. Rows are only ever appended.
///
/// Row `i` spans `indices[indptr[i]..indptr[i + 1]]` and the same range of
/// `values`, so the whole matrix lives in three contiguous arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatrix {
    columns: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl DocumentMatrix {
    /// Creates an empty matrix with `columns` columns.
    pub fn new(columns: usize) -> DocumentMatrix {
        DocumentMatrix { columns, indptr: vec![0], indices: Vec::new(), values: Vec::new() }
    }

    pub fn rows(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Appends `vector` as the new last row.
    ///
    /// Fails with `DimensionMismatch` if the vector references a column the
    /// matrix does not have; the matrix is left untouched in that case.
    pub fn push_row(&mut self, vector: &SparseVector) -> Result<()> {
        if let Some(col) = vector.max_column() {
            if col as usize >= self.columns {
                return Err(EngineError::DimensionMismatch {
                    columns: self.columns,
                    found: col as usize,
                });
            }
        }

        let row = vector.as_row();
        self.indices.extend_from_slice(row.indices);
        self.values.extend_from_slice(row.values);
        self.indptr.push(self.indices.len());
        Ok(())
    }

    /// Borrowed view of row `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.rows()`.
    pub fn row(&self, index: usize) -> SparseRow<'_> {
        let (start, end) = (self.indptr[index], self.indptr[index + 1]);
        SparseRow { indices: &self.indices[start..end], values: &self.values[start..end] }
    }

    /// Row with the highest dot product against `query`.
    ///
    /// Scans left to right and only replaces the best on a strictly greater
    /// score, so the earliest row wins ties. `None` when there are no rows.
    pub fn best_match(&self, query: SparseRow<'_>) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for i in 0..self.rows() {
            let sim = dot_product(self.row(i), query);
            match best {
                Some((_, score)) if sim <= score => {}
                _ => best = Some((i, sim)),
            }
        }
        best
    }

    /// The `top_k` rows by descending dot product against `query`.
    /// Equal scores keep row order.
    pub fn top_k(&self, query: SparseRow<'_>, top_k: usize) -> Vec<(usize, f32)> {
        if top_k == 0 {
            return Vec::new();
        }

        let mut dps: Vec<(usize, f32)> = Vec::with_capacity(top_k + 1);
        for i in 0..self.rows() {
            let sim = dot_product(self.row(i), query);
            let insert_index = dps.partition_point(|&x| x.1 >= sim);
            if insert_index < top_k {
                dps.insert(insert_index, (i, sim));
                dps.truncate(top_k);
            }
        }
        dps
    }

    /// Structural check for decoded data, so `row` can never slice out of range.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.indptr.first() != Some(&0) {
            return Err("matrix row pointer does not start at zero".to_string());
        }
        if self.indices.len() != self.values.len() {
            return Err(format!(
                "matrix has {} column indices but {} values",
                self.indices.len(),
                self.values.len()
            ));
        }
        if self.indptr.last() != Some(&self.indices.len()) {
            return Err("matrix row pointer does not cover the stored values".to_string());
        }
        if self.indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err("matrix row pointer is not monotonic".to_string());
        }
        for i in 0..self.rows() {
            let row = self.row(i);
            if row.indices.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("matrix row {} has unsorted columns", i));
            }
            if row.indices.last().is_some_and(|&c| c as usize >= self.columns) {
                return Err(format!("matrix row {} exceeds {} columns", i, self.columns));
            }
        }
        Ok(())
    }
}
