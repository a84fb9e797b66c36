use crate::errors::SolveError;

use super::lls::Line;

const NONE: usize = usize::MAX;

/// `L·D·Lᵀ` factors of a symmetric matrix.
///
/// Row `k` stores the strictly lower entries `L[k, j]` in ascending column
/// order followed by the pivot `D[k]`, the same layout as
/// [`LlsMatrix`](super::LlsMatrix).
#[derive(Clone, Debug, PartialEq)]
pub struct LdlFactor {
    lines: Vec<Line>,
}

impl LdlFactor {
    /// Factorise lower-triangular lines in place.
    ///
    /// Each line must hold entries with column `< k` in ascending order and
    /// end with the diagonal. Row `k` of `L` gets the fill of its elimination
    /// tree reach; the tree is grown as rows are processed.
    pub(crate) fn factorize(mut lines: Vec<Line>) -> Result<Self, SolveError> {
        let n = lines.len();
        let mut parent = vec![NONE; n];
        let mut flag = vec![NONE; n];
        let mut scattered = vec![0.0; n];
        let mut row = vec![0.0; n];
        let mut pivots = vec![0.0; n];

        for k in 0..n {
            flag[k] = k;
            let mut pattern = Vec::new();
            let mut pivot = 0.0;
            for (c, v) in lines[k].entries() {
                if c == k {
                    pivot += v;
                    continue;
                }
                scattered[c] += v;
                let mut i = c;
                while flag[i] != k {
                    if parent[i] == NONE {
                        parent[i] = k;
                    }
                    pattern.push(i);
                    flag[i] = k;
                    i = parent[i];
                }
            }
            pattern.sort_unstable();

            for &j in &pattern {
                let mut s = scattered[j];
                scattered[j] = 0.0;
                for (i, l_ji) in lines[j].off_diagonal() {
                    s -= l_ji * row[i] * pivots[i];
                }
                let l_kj = s / pivots[j];
                row[j] = l_kj;
                pivot -= l_kj * l_kj * pivots[j];
            }
            if pivot == 0.0 || !pivot.is_finite() {
                return Err(SolveError::ZeroPivot { row: k });
            }
            pivots[k] = pivot;

            let mut vals = Vec::with_capacity(pattern.len() + 1);
            for &j in &pattern {
                vals.push(row[j]);
                row[j] = 0.0;
            }
            vals.push(pivot);
            pattern.push(k);
            lines[k] = Line {
                cols: pattern,
                vals,
            };
        }
        Ok(Self { lines })
    }

    pub(crate) fn from_lines(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    /// Size of the factored matrix.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.lines.len()
    }

    /// Stored entries of `L` plus the pivots.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.lines.iter().map(|l| l.cols.len()).sum()
    }

    /// Pivot `D[k]`.
    #[must_use]
    pub fn pivot(&self, k: usize) -> f64 {
        self.lines[k].diagonal()
    }

    /// Solve `L·D·Lᵀ·x = b`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::DimensionMismatch`] when `b` has the wrong length.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>, SolveError> {
        if b.len() != self.dim() {
            return Err(SolveError::DimensionMismatch {
                expected: self.dim(),
                found: b.len(),
            });
        }
        let mut x = b.to_vec();
        self.solve_in_place(&mut x);
        Ok(x)
    }

    /// Forward substitution, diagonal scaling and back substitution on `x`.
    pub(crate) fn solve_in_place(&self, x: &mut [f64]) {
        for (k, line) in self.lines.iter().enumerate() {
            let s: f64 = line.off_diagonal().map(|(j, l)| l * x[j]).sum();
            x[k] -= s;
        }
        for (k, line) in self.lines.iter().enumerate() {
            x[k] /= line.diagonal();
        }
        for (k, line) in self.lines.iter().enumerate().rev() {
            let xk = x[k];
            for (j, l) in line.off_diagonal() {
                x[j] -= l * xk;
            }
        }
    }
}
