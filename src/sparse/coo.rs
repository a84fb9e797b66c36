/// Coordinate-list builder for a square matrix.
///
/// Duplicate entries are kept and summed when converting to a compressed
/// format.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CooMatrix {
    nrows: usize,
    i: Vec<usize>,
    j: Vec<usize>,
    v: Vec<f64>,
}

impl CooMatrix {
    /// Empty `n × n` builder.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            nrows: n,
            ..Self::default()
        }
    }

    /// Empty builder with room for `capacity` triplets.
    #[must_use]
    pub fn with_capacity(n: usize, capacity: usize) -> Self {
        Self {
            nrows: n,
            i: Vec::with_capacity(capacity),
            j: Vec::with_capacity(capacity),
            v: Vec::with_capacity(capacity),
        }
    }

    /// Add `v` at `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics when the index lies outside the matrix.
    #[inline]
    pub fn push(&mut self, i: usize, j: usize, v: f64) {
        assert!(i < self.nrows && j < self.nrows, "entry ({i}, {j}) outside {}", self.nrows);
        self.i.push(i);
        self.j.push(j);
        self.v.push(v);
    }

    /// Number of rows (and columns).
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of stored triplets, duplicates included.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.v.len()
    }

    /// Iterate over the stored triplets in insertion order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.i
            .iter()
            .zip(&self.j)
            .zip(&self.v)
            .map(|((i, j), v)| (*i, *j, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_kept() {
        let mut coo = CooMatrix::new(2);
        coo.push(0, 1, 1.0);
        coo.push(0, 1, 2.0);
        assert_eq!(coo.nnz(), 2);
        assert_eq!(coo.triplets().collect::<Vec<_>>(), vec![(0, 1, 1.0), (0, 1, 2.0)]);
    }

    #[test]
    #[should_panic]
    fn out_of_range_entry_panics() {
        let mut coo = CooMatrix::new(2);
        coo.push(2, 0, 1.0);
    }
}
