use crate::assembly::DofMap;
use crate::errors::SolveError;

use super::coo::CooMatrix;
use super::ldl::LdlFactor;
use super::lls::{Line, LlsMatrix};
use super::LinearOperator;

/// Full symmetric matrix in compressed row storage.
#[derive(Clone, Debug, PartialEq)]
pub struct CrsMatrix {
    row_ptr: Vec<usize>,
    col: Vec<usize>,
    val: Vec<f64>,
}

impl CrsMatrix {
    /// Compress triplets, renumbered through `map`, sorting by `(row, col)` and
    /// summing duplicates. Triplets at restrained degrees of freedom are dropped.
    #[must_use]
    pub fn from_coo(coo: &CooMatrix, map: &DofMap) -> Self {
        let n = map.size();
        let mut triplets: Vec<(usize, usize, f64)> = coo
            .triplets()
            .filter_map(|(i, j, v)| Some((map.equation(i)?, map.equation(j)?, v)))
            .collect();
        triplets.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_ptr = vec![0; n + 1];
        let mut col = Vec::with_capacity(triplets.len());
        let mut val: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut previous = None;
        for (r, c, v) in triplets {
            if previous == Some((r, c)) {
                if let Some(sum) = val.last_mut() {
                    *sum += v;
                }
                continue;
            }
            previous = Some((r, c));
            row_ptr[r + 1] += 1;
            col.push(c);
            val.push(v);
        }
        for r in 0..n {
            row_ptr[r + 1] += row_ptr[r];
        }
        Self { row_ptr, col, val }
    }

    /// Number of equations.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// Stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.val.len()
    }

    /// Entry `(r, c)`, zero when not stored.
    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let range = self.row_ptr[r]..self.row_ptr[r + 1];
        match self.col[range.clone()].binary_search(&c) {
            Ok(offset) => self.val[range.start + offset],
            Err(_) => 0.0,
        }
    }

    fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[r]..self.row_ptr[r + 1];
        self.col[range.clone()]
            .iter()
            .copied()
            .zip(self.val[range].iter().copied())
    }

    /// Lower triangle in line storage.
    #[must_use]
    pub fn to_lls(&self) -> LlsMatrix {
        LlsMatrix::from_lines(self.lower_lines())
    }

    fn lower_lines(&self) -> Vec<Line> {
        (0..self.nrows())
            .map(|r| Line::from_entries(r, self.row(r).filter(|(c, _)| *c <= r).collect()))
            .collect()
    }

    /// Factorise into `L·D·Lᵀ`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::ZeroPivot`] when a pivot vanishes.
    pub fn factorize(&self) -> Result<LdlFactor, SolveError> {
        LdlFactor::factorize(self.lower_lines())
    }
}

impl LinearOperator for CrsMatrix {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn apply(&self, y: &mut [f64], x: &[f64]) {
        for (r, out) in y.iter_mut().enumerate() {
            *out = self.row(r).map(|(c, v)| v * x[c]).sum();
        }
    }
}
