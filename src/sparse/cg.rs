use serde::{Deserialize, Serialize};

use crate::errors::SolveError;

use super::{dot, LinearOperator};

/// Stopping rule of the conjugate gradient iteration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CgSettings {
    /// Absolute tolerance: iteration stops once `‖r‖² ≤ ε`.
    pub epsilon: f64,
    /// Iteration cap; `None` allows ten sweeps over the system size.
    pub max_iterations: Option<usize>,
}

impl Default for CgSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            max_iterations: None,
        }
    }
}

/// Statistics of a converged solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgOutput {
    /// Iterations performed.
    pub iterations: usize,
    /// Squared residual norm at exit.
    pub residual: f64,
}

/// Solve `A·x = b` by preconditioned conjugate gradient from `x = 0`.
///
/// `preconditioner` applies `C⁻¹`; pass [`IdentityOperator`](super::IdentityOperator)
/// for plain CG.
///
/// # Errors
///
/// Returns [`SolveError::DimensionMismatch`] when `b` does not fit `a`,
/// [`SolveError::Indefinite`] when a search direction has non-positive
/// curvature and [`SolveError::NotConverged`] when the iteration cap is hit.
pub fn conjugate_gradient<A, P>(
    a: &A,
    preconditioner: &P,
    b: &[f64],
    settings: CgSettings,
) -> Result<(Vec<f64>, CgOutput), SolveError>
where
    A: LinearOperator + ?Sized,
    P: LinearOperator + ?Sized,
{
    let n = a.dim();
    if b.len() != n {
        return Err(SolveError::DimensionMismatch {
            expected: n,
            found: b.len(),
        });
    }
    let max_iterations = settings.max_iterations.unwrap_or(10 * n.max(10));

    let mut x = vec![0.0; n];
    let mut r = b.to_vec();
    let mut z = vec![0.0; n];
    let mut ap = vec![0.0; n];

    let mut rr = dot(&r, &r);
    if rr <= settings.epsilon {
        return Ok((
            x,
            CgOutput {
                iterations: 0,
                residual: rr,
            },
        ));
    }
    preconditioner.apply(&mut z, &r);
    let mut p = z.clone();
    let mut rz = dot(&r, &z);

    for iteration in 1..=max_iterations {
        a.apply(&mut ap, &p);
        let curvature = dot(&p, &ap);
        if curvature <= 0.0 || !curvature.is_finite() {
            return Err(SolveError::Indefinite { iteration });
        }
        let alpha = rz / curvature;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        rr = dot(&r, &r);
        if rr <= settings.epsilon {
            return Ok((
                x,
                CgOutput {
                    iterations: iteration,
                    residual: rr,
                },
            ));
        }
        preconditioner.apply(&mut z, &r);
        let rz_next = dot(&r, &z);
        let beta = rz_next / rz;
        rz = rz_next;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
    }
    Err(SolveError::NotConverged {
        iterations: max_iterations,
        residual: rr,
    })
}
