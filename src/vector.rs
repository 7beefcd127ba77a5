//! This is the vector math module
//! Provide sparse vectors, L2 normalization and dot product

/// Owned sparse vector.
/// Column indices are strictly increasing and every stored value is non-zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

/// Borrowed view over one sparse row, either a `SparseVector` or a matrix row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseRow<'a> {
    pub indices: &'a [u32],
    pub values: &'a [f32],
}

impl SparseVector {
    /// Builds a vector from `(column, value)` pairs.
    /// Pairs are sorted by column, duplicate columns are summed and zeros dropped.
    pub fn from_entries(mut entries: Vec<(u32, f32)>) -> SparseVector {
        entries.sort_by_key(|&(col, _)| col);

        let mut indices: Vec<u32> = Vec::with_capacity(entries.len());
        let mut values: Vec<f32> = Vec::with_capacity(entries.len());
        for (col, value) in entries {
            if indices.last() == Some(&col) {
                if let Some(last) = values.last_mut() {
                    *last += value;
                }
            } else {
                indices.push(col);
                values.push(value);
            }
        }

        let mut vector = SparseVector { indices, values };
        vector.drop_zeros();
        vector
    }

    pub fn as_row(&self) -> SparseRow<'_> {
        SparseRow { indices: &self.indices, values: &self.values }
    }

    /// Number of stored (non-zero) components.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    /// Highest column referenced, if any.
    pub fn max_column(&self) -> Option<u32> {
        self.indices.last().copied()
    }

    /// Value stored at `column`, zero when absent.
    pub fn get(&self, column: u32) -> f32 {
        match self.indices.binary_search(&column) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Normalizes in place with [`l2_norm`].
    pub fn normalize(&mut self) {
        self.values = l2_norm(&self.values);
        self.drop_zeros();
    }

    fn drop_zeros(&mut self) {
        if self.values.iter().all(|v| *v != 0.0) {
            return;
        }
        let (indices, values) = self.indices.iter()
            .zip(self.values.iter())
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (*i, *v))
            .unzip();
        self.indices = indices;
        self.values = values;
    }
}

impl<'a> SparseRow<'a> {
    pub fn iter(self) -> impl Iterator<Item = (u32, f32)> + 'a {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Euclidean norm of the row.
    pub fn norm(&self) -> f32 {
        self.values.iter()
            .map(|x| x * x)
            .sum::<f32>()
            .sqrt()
    }
}

/// L2 Normalization
/// norm_vec = vec / ||vec||
/// The zero vector (and the empty vector) is returned unchanged
pub fn l2_norm(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();

    if norm == 0.0 {
        return vector.to_vec();
    }

    vector.iter()
        .map(|x| x / norm)
        .collect()
}

/// Dot Product
/// dot_prod = sum(a[i] * b[i]) over the columns present in both rows
/// Both rows must have strictly increasing column indices
pub fn dot_product(left: SparseRow<'_>, right: SparseRow<'_>) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut dot_prod = 0.0;

    while i < left.indices.len() && j < right.indices.len() {
        match left.indices[i].cmp(&right.indices[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot_prod += left.values[i] * right.values[j];
                i += 1;
                j += 1;
            }
        }
    }

    dot_prod
}

#[cfg(test)]
mod vector_test {
    use super::*;

    // ========== L2 Normalization Tests ==========

    #[test]
    fn test_l2_norm_basic() {
        // [3.0, 4.0] normalizes to [0.6, 0.8] because ||[3,4]|| = 5
        let result = l2_norm(&[3.0, 4.0]);

        assert_eq!(result.len(), 2);
        assert!((result[0] - 0.6).abs() < 1e-6);
        assert!((result[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_is_unit_length() {
        let result = l2_norm(&[1.0, 2.0, 3.0, 4.0]);

        let norm: f32 = result.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm_zero_vector_stays_zero() {
        let result = l2_norm(&[0.0, 0.0, 0.0]);
        assert_eq!(result, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_l2_norm_empty_vector() {
        assert!(l2_norm(&[]).is_empty());
    }

    // ========== Sparse Vector Tests ==========

    #[test]
    fn test_from_entries_sorts_and_merges() {
        let v = SparseVector::from_entries(vec![(4, 1.0), (1, 2.0), (4, 0.5), (2, 0.0)]);

        assert_eq!(v.as_row().indices, &[1, 4]);
        assert_eq!(v.as_row().values, &[2.0, 1.5]);
        assert_eq!(v.nnz(), 2);
        assert_eq!(v.max_column(), Some(4));
        assert_eq!(v.get(2), 0.0);
    }

    #[test]
    fn test_normalize_sparse() {
        let mut v = SparseVector::from_entries(vec![(0, 3.0), (7, 4.0)]);
        v.normalize();

        assert!((v.get(0) - 0.6).abs() < 1e-6);
        assert!((v.get(7) - 0.8).abs() < 1e-6);
        assert!((v.as_row().norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_sparse() {
        let mut v = SparseVector::default();
        v.normalize();
        assert!(v.is_zero());
    }

    // ========== Dot Product Tests ==========

    #[test]
    fn test_dot_product_overlapping_columns() {
        let a = SparseVector::from_entries(vec![(0, 1.0), (2, 2.0), (5, 3.0)]);
        let b = SparseVector::from_entries(vec![(2, 4.0), (3, 9.0), (5, 5.0)]);
        // Shared columns 2 and 5: 2*4 + 3*5 = 23
        assert!((dot_product(a.as_row(), b.as_row()) - 23.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_product_disjoint() {
        let a = SparseVector::from_entries(vec![(0, 1.0)]);
        let b = SparseVector::from_entries(vec![(1, 1.0)]);
        assert_eq!(dot_product(a.as_row(), b.as_row()), 0.0);
    }

    #[test]
    fn test_dot_product_with_zero_vector() {
        let a = SparseVector::from_entries(vec![(0, 1.0), (1, 2.0)]);
        let zero = SparseVector::default();
        assert_eq!(dot_product(a.as_row(), zero.as_row()), 0.0);
    }

    #[test]
    fn test_normalize_then_dot_product() {
        let mut v1 = SparseVector::from_entries(vec![(0, 1.0)]);
        let mut v2 = SparseVector::from_entries(vec![(0, 0.7), (1, 0.7)]);
        v1.normalize();
        v2.normalize();

        // v2 normalized is ~[0.707, 0.707]
        let similarity = dot_product(v1.as_row(), v2.as_row());
        assert!((similarity - 0.707).abs() < 0.001);
    }
}
