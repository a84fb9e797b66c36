//! Connection descriptors for each degree of freedom at an element end.

use serde::{Deserialize, Serialize};

/// How one degree of freedom of an element end is tied to its node.
///
/// Slot `6 * end + k` of [`Element::bonds`](crate::Element::bonds) holds the
/// bond of component `k` at end `end`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Bond {
    /// Fully continuous with the node.
    #[default]
    Rigid,
    /// Disconnected: the element carries no force in this component.
    Released,
    /// Plastic hinge.
    ///
    /// `active` hinges take part in elastoplastic condensation; `loaded`
    /// records that the hinge has reached the yield surface at some point.
    PlasticHinge {
        /// Whether the hinge takes part in plastic condensation.
        active: bool,
        /// Whether the hinge has yielded.
        loaded: bool,
    },
    /// Spring of finite stiffness between element end and node.
    Spring {
        /// Stiffness acting with the strong-axis bending stiffness.
        k_strong: f64,
        /// Stiffness acting with the weak-axis bending stiffness.
        k_weak: f64,
    },
}

impl Bond {
    /// Decode the integer code used by the text format.
    ///
    /// Codes other than `0, 1, -1, -2, -3` are springs; their stiffness is
    /// supplied separately.
    #[must_use]
    pub fn from_code(code: i64, k_strong: f64, k_weak: f64) -> Self {
        match code {
            0 => Self::Rigid,
            1 => Self::Released,
            -1 => Self::PlasticHinge {
                active: true,
                loaded: true,
            },
            -2 => Self::PlasticHinge {
                active: false,
                loaded: false,
            },
            -3 => Self::PlasticHinge {
                active: false,
                loaded: true,
            },
            _ => Self::Spring { k_strong, k_weak },
        }
    }

    /// Integer code of the text format; springs report `2`.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::Rigid => 0,
            Self::Released => 1,
            Self::PlasticHinge { active: true, .. } => -1,
            Self::PlasticHinge {
                active: false,
                loaded: false,
            } => -2,
            Self::PlasticHinge {
                active: false,
                loaded: true,
            } => -3,
            Self::Spring { .. } => 2,
        }
    }

    /// Active plastic hinge that has yielded.
    #[must_use]
    pub const fn yielded() -> Self {
        Self::PlasticHinge {
            active: true,
            loaded: true,
        }
    }

    /// Whether the component is cut loose from the node.
    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }

    /// Whether the component is excluded from the plastic flow direction.
    #[must_use]
    pub fn skips_plastic_flow(&self) -> bool {
        matches!(
            self,
            Self::Released | Self::PlasticHinge { active: false, .. }
        )
    }

    /// Spring stiffness seen by local dof `dof`, if this bond condenses it.
    ///
    /// Released components condense with zero stiffness; rigid components and
    /// plastic hinges are left to the elastic and plastic matrices.
    #[must_use]
    pub fn condensation_stiffness(&self, dof: usize) -> Option<f64> {
        match self {
            Self::Released => Some(0.0),
            Self::Spring { k_strong, k_weak } => {
                if matches!(dof % 6, 2 | 4) {
                    Some(*k_strong)
                } else {
                    Some(*k_weak)
                }
            }
            _ => None,
        }
    }
}
