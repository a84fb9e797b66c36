//! Frame nodes and their six degrees of freedom.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Dense index of a node inside its owning [`Frame`](crate::Frame).
///
/// The index doubles as the row block of the node in every global vector:
/// degree of freedom `d` of node `n` lives at `6 * n.0 + d`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Global equation of degree of freedom `dof`.
    #[must_use]
    pub const fn dof(self, dof: usize) -> usize {
        6 * self.0 + dof
    }
}

/// A frame node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node number from input.
    pub num: i64,
    /// Undeformed position.
    pub coord: Point,
    /// Restraint per degree of freedom; `true` means the displacement is held at zero.
    pub conf: [bool; 6],
    /// Applied nodal force and moment.
    pub force: [f64; 6],
    /// Accumulated displacement and rotation.
    pub disp: [f64; 6],
    /// Support reaction at restrained degrees of freedom.
    pub reaction: [f64; 6],
    /// Lumped mass.
    pub mass: f64,
}

impl Node {
    /// Create a free, unloaded node.
    #[must_use]
    pub fn new(num: i64, coord: Point) -> Self {
        Self {
            num,
            coord,
            conf: [false; 6],
            force: [0.0; 6],
            disp: [0.0; 6],
            reaction: [0.0; 6],
            mass: 0.0,
        }
    }

    /// Deformed position.
    #[must_use]
    pub fn current(&self) -> [f64; 3] {
        [
            self.coord.x + self.disp[0],
            self.coord.y + self.disp[1],
            self.coord.z + self.disp[2],
        ]
    }

    /// Number of restrained degrees of freedom.
    #[must_use]
    pub fn confined_count(&self) -> usize {
        self.conf.iter().filter(|c| **c).count()
    }

    /// Clear displacement and reaction.
    pub fn reset(&mut self) {
        self.disp = [0.0; 6];
        self.reaction = [0.0; 6];
    }
}
