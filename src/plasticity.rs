//! Yield function of element ends and elastoplastic condensation.
//!
//! Each end carries six stress resultants `N, Qx, Qy, Mz, Mx, My`. Their
//! distances from the envelope centre, normalised by the envelope half
//! widths, are combined into one scalar `f` per end:
//!
//! ```text
//! f1 = Σ_{N,Mz,Mx,My} v^exp     f2 = Σ_{Qx,Qy} v^exp
//! f  = (f1^(exq/exp) + f2^(exq/exp))^(1/exq)
//! ```

use serde::{Deserialize, Serialize};

use crate::element::ElementView;
use crate::errors::ElementError;
use crate::geometry::{Mat12, Vec12};

/// Constants of the yield and failure criteria.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialLaw {
    /// Yield function value above which an end is taken as yielded.
    pub radius: f64,
    /// Exponent used when a section does not supply its own.
    pub exponent: f64,
    /// Amplification of shear utilisation when checking for brittle failure.
    pub qufact: f64,
}

impl Default for MaterialLaw {
    fn default() -> Self {
        Self {
            radius: 0.95,
            exponent: 1.5,
            qufact: 1.25,
        }
    }
}

/// Components that enter the first (axial and bending) group.
const BENDING: [usize; 4] = [0, 3, 4, 5];
/// Components that enter the shear group.
const SHEAR: [usize; 2] = [1, 2];

/// Yield function of both ends of an element.
#[derive(Clone, Debug, PartialEq)]
pub struct Coefficients {
    /// Normalised distance of each component from the envelope centre.
    pub value: [[f64; 6]; 2],
    /// Combined yield function per end.
    pub f: [f64; 2],
    /// Direction of steepest increase of `f` with respect to the end forces.
    ///
    /// Only the six slots of the corresponding end are populated; the
    /// overall scale is immaterial to the plastic condensation.
    pub gradient: [Vec12; 2],
}

/// Outcome of checking one end against the material law.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndState {
    /// Inside the yield surface.
    Elastic,
    /// Past the yield radius; `slot` is the dominant component.
    Yielded {
        /// Element slot (`6 * end + component`) of the dominant component.
        slot: usize,
    },
    /// Shear beyond the brittle limit.
    Brittle {
        /// Element slot of the failing shear component.
        slot: usize,
    },
}

impl Coefficients {
    /// Classify end `end` against `law`.
    #[must_use]
    pub fn classify(&self, end: usize, law: &MaterialLaw) -> EndState {
        for j in SHEAR {
            if law.qufact * self.value[end][j] > 1.0 {
                return EndState::Brittle { slot: 6 * end + j };
            }
        }
        if self.f[end] > law.radius {
            let dominant = BENDING
                .iter()
                .copied()
                .max_by(|a, b| self.value[end][*a].total_cmp(&self.value[end][*b]))
                .unwrap_or(4);
            return EndState::Yielded {
                slot: 6 * end + dominant,
            };
        }
        EndState::Elastic
    }
}

/// Evaluate the yield function and its gradient at both ends.
#[must_use]
pub fn coefficients(view: &ElementView, law: &MaterialLaw) -> Coefficients {
    let section = view.section;
    let element = view.element;
    let exp = if section.exp > 0.0 { section.exp } else { law.exponent };
    let exq = if section.exq > 0.0 { section.exq } else { exp };
    let ratio = exq / exp;

    let mut value = [[0.0; 6]; 2];
    let mut unit = [[0.0; 6]; 2];
    let mut f = [0.0; 2];
    let mut gradient = [Vec12::zeros(); 2];

    for end in 0..2 {
        let sign = if end == 0 { 1.0 } else { -1.0 };
        let mut f1 = 0.0;
        let mut f2 = 0.0;
        for j in 0..6 {
            let slot = 6 * end + j;
            let fu = section.envelope.unit(j);
            if element.bonds[slot].is_released() || fu == 0.0 {
                continue;
            }
            let fc = section.envelope.center(j);
            let v = if SHEAR.contains(&j) {
                element.stress[slot] - fc
            } else {
                element.stress[slot] - sign * fc
            };
            value[end][j] = v.abs() / fu.abs();
            unit[end][j] = if v == 0.0 { 0.0 } else { v.signum() };
            let term = value[end][j].powf(exp);
            if SHEAR.contains(&j) {
                f2 += term;
            } else {
                f1 += term;
            }
        }
        f[end] = (f1.powf(ratio) + f2.powf(ratio)).powf(1.0 / exq);

        for j in 0..6 {
            let slot = 6 * end + j;
            let fu = section.envelope.unit(j);
            if value[end][j] == 0.0 || fu == 0.0 {
                continue;
            }
            let mut g = unit[end][j] / fu.abs() * value[end][j].powf(exp - 1.0);
            if exp != exq {
                let group = if SHEAR.contains(&j) { f2 } else { f1 };
                g *= if group > 0.0 {
                    group.powf(ratio - 1.0)
                } else {
                    0.0
                };
            }
            gradient[end][slot] = g;
        }
    }

    Coefficients { value, f, gradient }
}

/// Plastic correction `P` so that `K + P` is the elastoplastic tangent.
///
/// Ends with [`Element::phinge`](crate::Element::phinge) set are plastic.
/// Gradient components at released slots and inactive hinges are ignored.
/// The gradient is that of [`coefficients`] under `law`.
///
/// # Errors
///
/// Returns [`ElementError::SingularPlastic`] when both ends are plastic and
/// their interaction matrix is singular.
pub fn plastic_matrix(
    view: &ElementView,
    k: &Mat12,
    law: &MaterialLaw,
) -> Result<Mat12, ElementError> {
    let element = view.element;
    let coefficients = coefficients(view, law);
    let mut gradient = coefficients.gradient;
    for (slot, bond) in element.bonds.iter().enumerate() {
        if bond.skips_plastic_flow() {
            gradient[slot / 6][slot] = 0.0;
        }
    }

    let q = [k * gradient[0], k * gradient[1]];
    let a = [
        [gradient[0].dot(&q[0]), gradient[0].dot(&q[1])],
        [gradient[1].dot(&q[0]), gradient[1].dot(&q[1])],
    ];
    let plastic = [
        element.phinge[0] && a[0][0] != 0.0,
        element.phinge[1] && a[1][1] != 0.0,
    ];

    let mut p = Mat12::zeros();
    match plastic {
        [true, true] => {
            let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
            if det == 0.0 {
                return Err(ElementError::SingularPlastic {
                    element: element.num,
                });
            }
            for i in 0..12 {
                for j in 0..12 {
                    p[(i, j)] = -(a[1][1] * q[0][i] * q[0][j]
                        - a[0][1] * q[0][i] * q[1][j]
                        - a[1][0] * q[1][i] * q[0][j]
                        + a[0][0] * q[1][i] * q[1][j])
                        / det;
                }
            }
        }
        [true, false] | [false, true] => {
            let end = usize::from(plastic[1]);
            for i in 0..12 {
                for j in 0..12 {
                    p[(i, j)] = -q[end][i] * q[end][j] / a[end][end];
                }
            }
        }
        [false, false] => (),
    }
    Ok(p)
}
