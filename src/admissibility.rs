//! Per-element admissibility rules such as tension-only braces.

use std::fmt;

/// Outcome of an admissibility check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Nothing changed.
    AsIs,
    /// The element was taken out of the structure.
    Deleted,
    /// A previously deleted element was put back.
    Restored,
}

/// What a check sees of an element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CheckState {
    /// Whether the element currently takes part in the structure.
    pub valid: bool,
    /// Axial end force at the first end; positive in compression.
    pub axial: f64,
    /// Current deformed length.
    pub length: f64,
    /// Undeformed length.
    pub length0: f64,
}

/// User-supplied admissibility rule.
pub trait AdmissibilityCheck: Send + Sync {
    /// Decide the new validity given the element state.
    fn check(&self, state: &CheckState) -> CheckOutcome;
}

/// Admissibility rule carried by an element.
#[derive(Default)]
pub enum Admissibility {
    /// The element always takes part.
    #[default]
    Always,
    /// Tension-only member: removed once compression exceeds `threshold`,
    /// restored when it is stretched again.
    Incompressible {
        /// Compressive axial force that removes the member.
        threshold: f64,
    },
    /// Compression-only member such as a lift-off soil spring: removed once
    /// tension exceeds `threshold`, restored when it is shortened again.
    TensionFree {
        /// Tensile axial force that removes the member.
        threshold: f64,
    },
    /// Arbitrary rule.
    Custom(Box<dyn AdmissibilityCheck>),
}

impl Admissibility {
    /// Evaluate the rule. The caller applies the outcome to the element.
    #[must_use]
    pub fn evaluate(&self, state: &CheckState) -> CheckOutcome {
        match self {
            Self::Always => CheckOutcome::AsIs,
            Self::Incompressible { threshold } => {
                if !state.valid && state.length > state.length0 {
                    CheckOutcome::Restored
                } else if state.valid && state.axial > *threshold {
                    CheckOutcome::Deleted
                } else {
                    CheckOutcome::AsIs
                }
            }
            Self::TensionFree { threshold } => {
                if !state.valid && state.length < state.length0 {
                    CheckOutcome::Restored
                } else if state.valid && -state.axial > *threshold {
                    CheckOutcome::Deleted
                } else {
                    CheckOutcome::AsIs
                }
            }
            Self::Custom(check) => check.check(state),
        }
    }

    /// Whether the element carries any rule at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Always)
    }
}

impl fmt::Debug for Admissibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Incompressible { threshold } => {
                write!(f, "Incompressible {{ threshold: {threshold} }}")
            }
            Self::TensionFree { threshold } => {
                write!(f, "TensionFree {{ threshold: {threshold} }}")
            }
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(valid: bool, axial: f64, length: f64) -> CheckState {
        CheckState {
            valid,
            axial,
            length,
            length0: 1.0,
        }
    }

    #[test]
    fn incompressible_deletes_under_compression() {
        let rule = Admissibility::Incompressible { threshold: 0.0 };
        assert_eq!(rule.evaluate(&state(true, 5.0, 0.99)), CheckOutcome::Deleted);
        assert_eq!(rule.evaluate(&state(true, -5.0, 1.01)), CheckOutcome::AsIs);
    }

    #[test]
    fn incompressible_restores_when_stretched() {
        let rule = Admissibility::Incompressible { threshold: 0.0 };
        assert_eq!(rule.evaluate(&state(false, 0.0, 1.01)), CheckOutcome::Restored);
        assert_eq!(rule.evaluate(&state(false, 0.0, 0.99)), CheckOutcome::AsIs);
    }

    #[test]
    fn tension_free_mirrors_incompressible() {
        let rule = Admissibility::TensionFree { threshold: 0.0 };
        assert_eq!(rule.evaluate(&state(true, -1.0, 1.01)), CheckOutcome::Deleted);
        assert_eq!(rule.evaluate(&state(false, 0.0, 0.99)), CheckOutcome::Restored);
    }

    struct Never;

    impl AdmissibilityCheck for Never {
        fn check(&self, state: &CheckState) -> CheckOutcome {
            if state.valid {
                CheckOutcome::Deleted
            } else {
                CheckOutcome::AsIs
            }
        }
    }

    #[test]
    fn custom_rule_is_dispatched() {
        let rule = Admissibility::Custom(Box::new(Never));
        assert!(rule.is_active());
        assert_eq!(rule.evaluate(&state(true, 0.0, 1.0)), CheckOutcome::Deleted);
    }
}
