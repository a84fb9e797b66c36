//! Analysis parameters.
//!
//! Every record fills missing fields from its defaults, so a JSON document
//! only needs to name what it changes:
//!
//! ```
//! use arclm::{AnalysisConfig, Strategy};
//!
//! let json = r#"{ "solver": { "strategy": "LLS_PCG" } }"#;
//! let config = AnalysisConfig::from_json_str(json).unwrap();
//! assert_eq!(config.solver.strategy, Strategy::LlsPcg);
//! assert_eq!(config.material.radius, 0.95);
//! ```

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;
pub use crate::plasticity::MaterialLaw;
use crate::solver::Strategy;

/// Choice of solver and its tolerances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Storage format and algorithm.
    pub strategy: Strategy,
    /// Absolute tolerance `ε` of the iterative strategies on `‖r‖²`.
    pub epsilon: f64,
    /// Iteration cap of the iterative strategies.
    pub max_iterations: Option<usize>,
    /// Number equations in the frame's pivot order for line storage.
    pub use_pivot_hint: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Lls,
            epsilon: 1e-12,
            max_iterations: None,
            use_pivot_hint: true,
        }
    }
}

/// Load stepping of the elastoplastic analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Number of laps the load range is divided into.
    pub nlap: usize,
    /// Factor applied to the step after a brittle failure.
    pub safety: f64,
    /// Load factor at the start.
    pub start: f64,
    /// Load factor at which the analysis ends.
    pub max: f64,
    /// Reset the frame before stepping; otherwise continue from its state.
    pub init: bool,
    /// Step reductions allowed over the whole run.
    pub max_backoff: usize,
    /// Include geometric stiffness in the tangent.
    pub geometric: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            nlap: 10,
            safety: 0.5,
            start: 0.0,
            max: 1.0,
            init: true,
            max_backoff: 8,
            geometric: false,
        }
    }
}

impl StepConfig {
    /// Check that the stepping can make progress.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidParameters`] for a zero lap count, an
    /// empty or reversed load range, or a safety factor outside `(0, 1)`.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.nlap == 0 {
            return Err(AnalysisError::InvalidParameters("nlap must be positive".into()));
        }
        if !(self.max > self.start) {
            return Err(AnalysisError::InvalidParameters(format!(
                "load range {}..{} is empty",
                self.start, self.max
            )));
        }
        if !(self.safety > 0.0 && self.safety < 1.0) {
            return Err(AnalysisError::InvalidParameters(format!(
                "safety factor {} must lie in (0, 1)",
                self.safety
            )));
        }
        Ok(())
    }

    /// Initial step `(max - start) / nlap`.
    #[must_use]
    pub fn step(&self) -> f64 {
        (self.max - self.start) / self.nlap as f64
    }
}

/// Soil spring iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilConfig {
    /// Section numbers whose elements are lift-off soil springs.
    pub sections: Vec<i64>,
    /// Tensile force at which a spring lifts off.
    pub threshold: f64,
    /// Relative change of the displacements accepted as converged.
    pub epsilon: f64,
    /// Passes allowed before giving up.
    pub max_iterations: usize,
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            threshold: 0.0,
            epsilon: 1e-6,
            max_iterations: 20,
        }
    }
}

/// All parameters of an analysis run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Yield and failure criteria.
    pub material: MaterialLaw,
    /// Linear solver.
    pub solver: SolverConfig,
    /// Load stepping.
    pub step: StepConfig,
    /// Soil springs.
    pub soil: SoilConfig,
}

impl AnalysisConfig {
    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidParameters`] when the document is malformed.
    pub fn from_json_str(text: &str) -> Result<Self, AnalysisError> {
        serde_json::from_str(text).map_err(|e| AnalysisError::InvalidParameters(e.to_string()))
    }

    /// Parse a JSON document from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidParameters`] when the document is malformed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnalysisError> {
        serde_json::from_reader(reader).map_err(|e| AnalysisError::InvalidParameters(e.to_string()))
    }

    /// Serialise to pretty-printed JSON.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AnalysisConfig::from_json_str("{}").expect("valid json");
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.material.qufact, 1.25);
        assert_eq!(config.solver.strategy, Strategy::Lls);
        assert_eq!(config.step.safety, 0.5);
    }

    #[test]
    fn partial_records_keep_other_defaults() {
        let config = AnalysisConfig::from_reader(
            r#"{ "step": { "nlap": 40, "geometric": true }, "soil": { "sections": [901, 902] } }"#
                .as_bytes(),
        )
        .expect("valid json");
        assert_eq!(config.step.nlap, 40);
        assert!(config.step.geometric);
        assert_eq!(config.step.max_backoff, 8);
        assert_eq!(config.soil.sections, vec![901, 902]);
        assert_eq!(config.soil.max_iterations, 20);
    }

    #[test]
    fn unknown_strategy_is_a_parameter_error() {
        let error = AnalysisConfig::from_json_str(r#"{ "solver": { "strategy": "DENSE" } }"#)
            .expect_err("unknown strategy");
        assert!(matches!(error, AnalysisError::InvalidParameters(_)));
    }

    #[test]
    fn config_survives_json() {
        let mut config = AnalysisConfig::default();
        config.solver.max_iterations = Some(500);
        config.soil.sections = vec![7];
        let text = config.to_json_string();
        let back = AnalysisConfig::from_json_str(&text).expect("valid json");
        assert_eq!(back.solver.max_iterations, Some(500));
        assert_eq!(back.soil.sections, vec![7]);
        assert_eq!(back.step.nlap, config.step.nlap);
    }

    #[test]
    fn step_validation() {
        assert!(StepConfig::default().validate().is_ok());
        let reversed = StepConfig {
            start: 1.0,
            max: 0.5,
            ..StepConfig::default()
        };
        assert!(reversed.validate().is_err());
        let no_laps = StepConfig {
            nlap: 0,
            ..StepConfig::default()
        };
        assert!(no_laps.validate().is_err());
        assert_eq!(StepConfig::default().step(), 0.1);
    }
}
