use log::debug;

use crate::assembly::DofMap;
use crate::errors::SolveError;

use super::coo::CooMatrix;
use super::ldl::LdlFactor;
use super::LinearOperator;

/// One row of a lower-triangular line store: ascending columns, diagonal last.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Line {
    pub(crate) cols: Vec<usize>,
    pub(crate) vals: Vec<f64>,
}

impl Line {
    /// Build from unsorted entries of row `row`, summing duplicates.
    pub(crate) fn from_entries(row: usize, mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|(c, _)| *c);
        let mut line = Self {
            cols: Vec::with_capacity(entries.len() + 1),
            vals: Vec::with_capacity(entries.len() + 1),
        };
        for (c, v) in entries {
            match line.cols.last() {
                Some(last) if *last == c => {
                    if let Some(sum) = line.vals.last_mut() {
                        *sum += v;
                    }
                }
                _ => {
                    line.cols.push(c);
                    line.vals.push(v);
                }
            }
        }
        if line.cols.last() != Some(&row) {
            line.cols.push(row);
            line.vals.push(0.0);
        }
        line
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.cols.iter().copied().zip(self.vals.iter().copied())
    }

    pub(crate) fn off_diagonal(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        let n = self.cols.len().saturating_sub(1);
        self.cols[..n].iter().copied().zip(self.vals[..n].iter().copied())
    }

    pub(crate) fn diagonal(&self) -> f64 {
        self.vals.last().copied().unwrap_or(0.0)
    }
}

/// Symmetric matrix stored as the lines of its lower triangle.
///
/// Each line lists its strictly lower entries in ascending column order and
/// keeps the diagonal as its last entry, so LDLᵀ can overwrite the lines one
/// by one.
#[derive(Clone, Debug, PartialEq)]
pub struct LlsMatrix {
    lines: Vec<Line>,
}

impl LlsMatrix {
    /// Compress full symmetric triplets into reduced lower lines.
    ///
    /// Triplets at restrained degrees of freedom are dropped and the rest
    /// are renumbered through `map`; entries above the diagonal of the
    /// reduced numbering are skipped.
    #[must_use]
    pub fn from_coo(coo: &CooMatrix, map: &DofMap) -> Self {
        let n = map.size();
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (i, j, v) in coo.triplets() {
            if let (Some(r), Some(c)) = (map.equation(i), map.equation(j)) {
                if r >= c {
                    rows[r].push((c, v));
                }
            }
        }
        let lines = rows
            .into_iter()
            .enumerate()
            .map(|(r, entries)| Line::from_entries(r, entries))
            .collect();
        Self { lines }
    }

    pub(crate) fn from_lines(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    /// Number of equations.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.lines.len()
    }

    /// Stored entries of the lower triangle, diagonal included.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.lines.iter().map(|l| l.cols.len()).sum()
    }

    /// Diagonal entry of row `r`.
    #[must_use]
    pub fn diagonal(&self, r: usize) -> f64 {
        self.lines[r].diagonal()
    }

    /// Factorise into `L·D·Lᵀ`, reusing the line storage.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::ZeroPivot`] when a pivot vanishes.
    pub fn factorize(self) -> Result<LdlFactor, SolveError> {
        LdlFactor::factorize(self.lines)
    }

    /// Incomplete LDLᵀ restricted to the stored pattern.
    ///
    /// Returns `None` when a pivot is not positive.
    #[must_use]
    pub fn incomplete_ldl(&self) -> Option<LdlFactor> {
        let mut lines = self.lines.clone();
        for k in 0..lines.len() {
            let (done, rest) = lines.split_at_mut(k);
            let line = &mut rest[0];
            let last = line.cols.len() - 1;
            for idx in 0..last {
                let j = line.cols[idx];
                let prior = &done[j];
                // Merge row k (already factored part) with row j of L.
                let mut s = line.vals[idx];
                let (mut a, mut b) = (0, 0);
                let b_end = prior.cols.len() - 1;
                while a < idx && b < b_end {
                    match line.cols[a].cmp(&prior.cols[b]) {
                        std::cmp::Ordering::Less => a += 1,
                        std::cmp::Ordering::Greater => b += 1,
                        std::cmp::Ordering::Equal => {
                            let i = line.cols[a];
                            s -= line.vals[a] * prior.vals[b] * done[i].diagonal();
                            a += 1;
                            b += 1;
                        }
                    }
                }
                line.vals[idx] = s / prior.diagonal();
            }
            let mut pivot = line.vals[last];
            for idx in 0..last {
                pivot -= line.vals[idx] * line.vals[idx] * done[line.cols[idx]].diagonal();
            }
            if pivot <= 0.0 || !pivot.is_finite() {
                return None;
            }
            line.vals[last] = pivot;
        }
        Some(LdlFactor::from_lines(lines))
    }
}

impl LinearOperator for LlsMatrix {
    fn dim(&self) -> usize {
        self.lines.len()
    }

    fn apply(&self, y: &mut [f64], x: &[f64]) {
        y.iter_mut().for_each(|v| *v = 0.0);
        for (r, line) in self.lines.iter().enumerate() {
            for (c, v) in line.entries() {
                y[r] += v * x[c];
                if c != r {
                    y[c] += v * x[r];
                }
            }
        }
    }
}

/// Preconditioner for PCG on an [`LlsMatrix`].
#[derive(Clone, Debug, PartialEq)]
pub enum Preconditioner {
    /// Incomplete LDLᵀ on the matrix pattern.
    IncompleteLdl(LdlFactor),
    /// Inverse diagonal scaling.
    Jacobi(Vec<f64>),
}

impl Preconditioner {
    /// Incomplete LDLᵀ of `matrix`, or diagonal scaling when that breaks down.
    #[must_use]
    pub fn new(matrix: &LlsMatrix) -> Self {
        match matrix.incomplete_ldl() {
            Some(factor) => Self::IncompleteLdl(factor),
            None => {
                debug!("incomplete factorisation broke down; using diagonal scaling");
                Self::Jacobi(
                    (0..matrix.nrows())
                        .map(|r| {
                            let d = matrix.diagonal(r);
                            if d == 0.0 {
                                1.0
                            } else {
                                1.0 / d
                            }
                        })
                        .collect(),
                )
            }
        }
    }
}

impl LinearOperator for Preconditioner {
    fn dim(&self) -> usize {
        match self {
            Self::IncompleteLdl(factor) => factor.dim(),
            Self::Jacobi(inverse) => inverse.len(),
        }
    }

    fn apply(&self, y: &mut [f64], x: &[f64]) {
        match self {
            Self::IncompleteLdl(factor) => {
                y.copy_from_slice(x);
                factor.solve_in_place(y);
            }
            Self::Jacobi(inverse) => {
                for ((out, v), s) in y.iter_mut().zip(x).zip(inverse) {
                    *out = v * s;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::testing::{free, multiply, tridiagonal};
    use approx::assert_relative_eq;

    #[test]
    fn lower_lines_keep_diagonal_last() {
        let mut coo = tridiagonal(3, 2.0, -1.0);
        coo.push(2, 2, 1.0);
        let lls = LlsMatrix::from_coo(&coo, &free(3));
        assert_eq!(lls.nnz(), 5);
        assert_eq!(lls.lines[1].cols, vec![0, 1]);
        assert_relative_eq!(lls.diagonal(2), 3.0);
    }

    #[test]
    fn restrained_rows_are_dropped() {
        let coo = tridiagonal(3, 2.0, -1.0);
        let lls = LlsMatrix::from_coo(&coo, &DofMap::new(&[false, true, false]));
        assert_eq!(lls.nrows(), 2);
        assert_eq!(lls.nnz(), 2);
    }

    #[test]
    fn missing_diagonal_is_stored_as_zero() {
        let mut coo = CooMatrix::new(2);
        coo.push(0, 0, 1.0);
        coo.push(1, 0, 0.5);
        coo.push(0, 1, 0.5);
        let lls = LlsMatrix::from_coo(&coo, &free(2));
        assert_eq!(lls.lines[1].cols, vec![0, 1]);
        assert_eq!(lls.diagonal(1), 0.0);
    }

    #[test]
    fn multiply_mirrors_lower_entries() {
        let coo = tridiagonal(4, 3.0, -1.0);
        let lls = LlsMatrix::from_coo(&coo, &free(4));
        let x = [1.0, -2.0, 0.5, 4.0];
        let mut y = [0.0; 4];
        lls.apply(&mut y, &x);
        assert_eq!(y.to_vec(), multiply(&coo, &x));
    }

    #[test]
    fn incomplete_factor_is_exact_without_fill() {
        let lls = LlsMatrix::from_coo(&tridiagonal(5, 4.0, -1.0), &free(5));
        let exact = lls.clone().factorize().expect("spd");
        assert_eq!(lls.incomplete_ldl(), Some(exact));
    }

    #[test]
    fn indefinite_matrix_falls_back_to_scaling() {
        let mut coo = CooMatrix::new(2);
        coo.push(0, 0, 1.0);
        coo.push(1, 1, -2.0);
        let lls = LlsMatrix::from_coo(&coo, &free(2));
        assert_eq!(
            Preconditioner::new(&lls),
            Preconditioner::Jacobi(vec![1.0, -0.5])
        );
    }
}
