//! Sparse symmetric storage and solvers for the reduced stiffness system.
//!
//! Assembly accumulates into a [`CooMatrix`]. Before solving, the triplets are
//! compressed either into a full symmetric [`CrsMatrix`] or into a
//! [`LlsMatrix`] holding one line per row of the lower triangle with the
//! diagonal stored last. Both can be factorised into an [`LdlFactor`] or used
//! as operators for [`conjugate_gradient`].

mod cg;
mod coo;
mod crs;
mod ldl;
mod lls;

pub use cg::{conjugate_gradient, CgOutput, CgSettings};
pub use coo::CooMatrix;
pub use crs::CrsMatrix;
pub use ldl::LdlFactor;
pub use lls::{LlsMatrix, Preconditioner};

/// A symmetric linear map `y = A·x`.
pub trait LinearOperator {
    /// Size of the square operator.
    fn dim(&self) -> usize;

    /// Overwrite `y` with `A·x`.
    fn apply(&self, y: &mut [f64], x: &[f64]);
}

impl<A: LinearOperator + ?Sized> LinearOperator for &A {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn apply(&self, y: &mut [f64], x: &[f64]) {
        (**self).apply(y, x);
    }
}

/// The identity, used as the preconditioner of plain CG.
#[derive(Clone, Copy, Debug)]
pub struct IdentityOperator(pub usize);

impl LinearOperator for IdentityOperator {
    fn dim(&self) -> usize {
        self.0
    }

    fn apply(&self, y: &mut [f64], x: &[f64]) {
        y.copy_from_slice(x);
    }
}

pub(crate) fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}
