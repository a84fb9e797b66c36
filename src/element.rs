//! Line elements and their geometry.

use serde::{Deserialize, Serialize};

use crate::admissibility::{Admissibility, CheckOutcome, CheckState};
use crate::bond::Bond;
use crate::errors::ElementError;
use crate::geometry::{block_rotation, cross, normalize, Mat12};
use crate::node::{Node, NodeId};
use crate::section::{Section, SectionId};

/// Index of an element inside its owning [`Frame`](crate::Frame).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub usize);

/// A two-node line element with six degrees of freedom per end.
#[derive(Debug)]
pub struct Element {
    /// Element number from input.
    pub num: i64,
    /// Section of the member.
    pub section: SectionId,
    /// End nodes; their order fixes the local axis direction.
    pub enod: [NodeId; 2],
    /// Rotation of the principal axes about the element axis, in radians.
    pub cang: f64,
    /// Connection of each end degree of freedom.
    pub bonds: [Bond; 12],
    /// Whether each end currently behaves as a plastic hinge.
    pub phinge: [bool; 2],
    /// Cached strong principal axis.
    pub strong: [f64; 3],
    /// Cached weak principal axis.
    pub weak: [f64; 3],
    /// Consistent member loads in local axes.
    pub cmq: [f64; 12],
    /// Accumulated end forces in local axes.
    pub stress: [f64; 12],
    /// Accumulated strain energy.
    pub energy: f64,
    /// Accumulated geometric stiffness energy.
    pub energyb: f64,
    /// Whether the element takes part in the structure.
    pub is_valid: bool,
    /// Admissibility rule.
    pub check: Admissibility,
    initial_bonds: [Bond; 12],
}

impl Element {
    /// Create a rigidly connected element.
    #[must_use]
    pub fn new(num: i64, section: SectionId, enod: [NodeId; 2]) -> Self {
        Self {
            num,
            section,
            enod,
            cang: 0.0,
            bonds: [Bond::Rigid; 12],
            phinge: [false; 2],
            strong: [0.0; 3],
            weak: [0.0; 3],
            cmq: [0.0; 12],
            stress: [0.0; 12],
            energy: 0.0,
            energyb: 0.0,
            is_valid: true,
            check: Admissibility::Always,
            initial_bonds: [Bond::Rigid; 12],
        }
    }

    /// Set the principal axis angle.
    #[must_use]
    pub fn with_cang(mut self, cang: f64) -> Self {
        self.cang = cang;
        self
    }

    /// Set the end bonds; they also become the state restored by [`Element::reset`].
    #[must_use]
    pub fn with_bonds(mut self, bonds: [Bond; 12]) -> Self {
        self.set_bonds(bonds);
        self
    }

    /// Set consistent member loads.
    #[must_use]
    pub fn with_cmq(mut self, cmq: [f64; 12]) -> Self {
        self.cmq = cmq;
        self
    }

    /// Make the element tension-only.
    pub fn set_incompressible(&mut self, threshold: f64) {
        self.check = Admissibility::Incompressible { threshold };
    }

    /// Replace the bonds and remember them as the initial state.
    pub fn set_bonds(&mut self, bonds: [Bond; 12]) {
        self.bonds = bonds;
        self.initial_bonds = bonds;
        self.phinge = Self::hinges_of(&bonds);
    }

    /// Bonds supplied at construction.
    #[must_use]
    pub fn initial_bonds(&self) -> &[Bond; 12] {
        &self.initial_bonds
    }

    /// Restore input bonds, validity and zero accumulated response.
    ///
    /// The stress is reset to the member loads; call
    /// [`modify_cmq`](crate::stiffness::modify_cmq) afterwards to account for releases.
    pub fn reset(&mut self) {
        self.bonds = self.initial_bonds;
        self.phinge = Self::hinges_of(&self.bonds);
        self.stress = self.cmq;
        self.energy = 0.0;
        self.energyb = 0.0;
        self.is_valid = true;
    }

    /// Mark end `end` as a plastic hinge, turning `slot` into an active hinge.
    pub fn yield_at(&mut self, end: usize, slot: usize) {
        self.phinge[end] = true;
        if self.bonds[slot] == Bond::Rigid {
            self.bonds[slot] = Bond::yielded();
        }
    }

    /// Take the element out of the structure, dropping its forces.
    pub fn delete(&mut self) {
        self.is_valid = false;
        self.stress = [0.0; 12];
    }

    /// Run the admissibility rule and apply its outcome.
    pub fn apply_check(&mut self, length: f64, length0: f64) -> CheckOutcome {
        let state = CheckState {
            valid: self.is_valid,
            axial: self.stress[0],
            length,
            length0,
        };
        let outcome = self.check.evaluate(&state);
        match outcome {
            CheckOutcome::Deleted => self.delete(),
            CheckOutcome::Restored => self.is_valid = true,
            CheckOutcome::AsIs => (),
        }
        outcome
    }

    fn hinges_of(bonds: &[Bond; 12]) -> [bool; 2] {
        let mut hinges = [false; 2];
        for (slot, bond) in bonds.iter().enumerate() {
            if matches!(bond, Bond::PlasticHinge { active: true, .. }) {
                hinges[slot / 6] = true;
            }
        }
        hinges
    }
}

/// An element borrowed together with its section and end nodes.
#[derive(Clone, Copy, Debug)]
pub struct ElementView<'a> {
    /// The element.
    pub element: &'a Element,
    /// Its section.
    pub section: &'a Section,
    /// Its end nodes in element order.
    pub nodes: [&'a Node; 2],
}

impl<'a> ElementView<'a> {
    /// Undeformed length.
    #[must_use]
    pub fn length0(&self) -> f64 {
        let a = self.nodes[0].coord.to_array();
        let b = self.nodes[1].coord.to_array();
        a.iter()
            .zip(&b)
            .map(|(p, q)| (q - p) * (q - p))
            .sum::<f64>()
            .sqrt()
    }

    /// Deformed length.
    #[must_use]
    pub fn length(&self) -> f64 {
        let d = self.direction(false);
        d.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Deformed axis from the first to the second node, optionally scaled to unit length.
    #[must_use]
    pub fn direction(&self, normalized: bool) -> [f64; 3] {
        let a = self.nodes[0].current();
        let b = self.nodes[1].current();
        let mut d = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        if normalized {
            normalize(&mut d);
        }
        d
    }

    /// Strong and weak principal axes for rotation `cang` about the element axis.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::ZeroLength`] when the end nodes coincide.
    pub fn principal_axis(&self, cang: f64) -> Result<([f64; 3], [f64; 3]), ElementError> {
        let d = self.direction(true);
        let (s, c) = cang.sin_cos();
        let dl1 = d.iter().map(|v| v * v).sum::<f64>().sqrt();
        let dl2 = (d[0] * d[0] + d[1] * d[1]).sqrt();
        if dl1 == 0.0 {
            return Err(ElementError::ZeroLength {
                element: self.element.num,
            });
        }
        let (mut strong, mut weak) = if dl2 == 0.0 {
            ([-s, c, 0.0], [-c, -s, 0.0])
        } else if dl2 / dl1 < 0.1 {
            (cross(&d, &[c, s, 0.0]), cross(&d, &[-s, c, 0.0]))
        } else {
            let mut x = [-d[1], d[0], 0.0];
            normalize(&mut x);
            let y = cross(&d, &x);
            (
                [
                    c * x[0] + s * y[0],
                    c * x[1] + s * y[1],
                    c * x[2] + s * y[2],
                ],
                [
                    -s * x[0] + c * y[0],
                    -s * x[1] + c * y[1],
                    -s * x[2] + c * y[2],
                ],
            )
        };
        normalize(&mut strong);
        normalize(&mut weak);
        // Members pointing downwards would otherwise get a left-handed triad.
        let handed = cross(&d, &strong);
        if handed.iter().zip(&weak).map(|(a, b)| a * b).sum::<f64>() < 0.0 {
            weak.iter_mut().for_each(|v| *v = -*v);
        }
        Ok((strong, weak))
    }

    /// Block-diagonal rotation from global to local axes.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::ZeroLength`] when the end nodes coincide.
    pub fn trans_matrix(&self) -> Result<Mat12, ElementError> {
        let (strong, weak) = self.principal_axis(self.element.cang)?;
        Ok(block_rotation(&[self.direction(true), strong, weak]))
    }

    /// Global equation of local dof `k` (0..12).
    #[must_use]
    pub fn global_dof(&self, k: usize) -> usize {
        self.element.enod[k / 6].dof(k % 6)
    }
}
