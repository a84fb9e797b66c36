//! Selectable strategies for solving the reduced stiffness system.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assembly::DofMap;
use crate::config::SolverConfig;
use crate::errors::SolveError;
use crate::frame::Frame;
use crate::sparse::{
    conjugate_gradient, CgSettings, CooMatrix, CrsMatrix, IdentityOperator, LdlFactor,
    LinearOperator, LlsMatrix, Preconditioner,
};

/// Storage format and algorithm used for a solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// LDLᵀ on compressed rows.
    #[serde(rename = "CRS")]
    Crs,
    /// Conjugate gradient on compressed rows.
    #[serde(rename = "CRS_CG")]
    CrsCg,
    /// LDLᵀ on lower lines, equations numbered by the frame's pivot order.
    #[default]
    #[serde(rename = "LLS")]
    Lls,
    /// Conjugate gradient on lower lines.
    #[serde(rename = "LLS_CG")]
    LlsCg,
    /// Conjugate gradient on lower lines with an incomplete LDLᵀ preconditioner.
    #[serde(rename = "LLS_PCG")]
    LlsPcg,
}

impl Strategy {
    /// All strategies in declaration order.
    pub const ALL: [Self; 5] = [Self::Crs, Self::CrsCg, Self::Lls, Self::LlsCg, Self::LlsPcg];

    /// Name used in configuration.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Crs => "CRS",
            Self::CrsCg => "CRS_CG",
            Self::Lls => "LLS",
            Self::LlsCg => "LLS_CG",
            Self::LlsPcg => "LLS_PCG",
        }
    }

    /// Whether the matrix is stored as lower lines.
    #[must_use]
    pub fn uses_lines(self) -> bool {
        matches!(self, Self::Lls | Self::LlsCg | Self::LlsPcg)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SolveError::UnknownStrategy(s.to_string()))
    }
}

/// Receives the wall-clock time of each solver phase.
pub type Laptime<'a> = dyn FnMut(&'static str, Duration) + 'a;

/// Solves an assembled system for several right-hand sides.
pub trait LinearSolver {
    /// Equation numbering to use for `frame`.
    fn dof_map(&self, frame: &Frame) -> DofMap;

    /// Solve `K·u = b` for every full-length `b` in `rhs`.
    ///
    /// `coo` is the unreduced builder; restrained degrees of freedom are
    /// eliminated through `map` and come back as zeros in the returned
    /// full-length displacement vectors.
    ///
    /// # Errors
    ///
    /// Returns the [`SolveError`] of the first failing right-hand side.
    fn solve(
        &self,
        coo: &CooMatrix,
        map: &DofMap,
        rhs: &[Vec<f64>],
        laptime: &mut Laptime<'_>,
    ) -> Result<Vec<Vec<f64>>, SolveError>;
}

/// [`LinearSolver`] driven by a [`SolverConfig`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    /// Solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solver using `strategy` and otherwise default settings.
    #[must_use]
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self::new(SolverConfig {
            strategy,
            ..SolverConfig::default()
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn cg_settings(&self) -> CgSettings {
        CgSettings {
            epsilon: self.config.epsilon,
            max_iterations: self.config.max_iterations,
        }
    }

    fn iterate<A, P>(&self, a: &A, p: &P, rhs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, SolveError>
    where
        A: LinearOperator + Sync,
        P: LinearOperator + Sync,
    {
        let settings = self.cg_settings();
        rhs.par_iter()
            .map(|b| {
                let (x, output) = conjugate_gradient(a, p, b, settings)?;
                debug!(
                    "cg converged in {} iterations, residual {:e}",
                    output.iterations, output.residual
                );
                Ok(x)
            })
            .collect()
    }

    fn substitute(factor: &LdlFactor, rhs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, SolveError> {
        rhs.par_iter().map(|b| factor.solve(b)).collect()
    }
}

fn timed<T>(phase: &'static str, laptime: &mut Laptime<'_>, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    debug!("{phase}: {:.3} ms", elapsed.as_secs_f64() * 1e3);
    laptime(phase, elapsed);
    result
}

impl LinearSolver for Solver {
    fn dof_map(&self, frame: &Frame) -> DofMap {
        let conf = frame.conf_mask();
        if self.config.strategy.uses_lines() && self.config.use_pivot_hint {
            DofMap::with_node_order(&conf, &frame.pivot_order())
        } else {
            DofMap::new(&conf)
        }
    }

    fn solve(
        &self,
        coo: &CooMatrix,
        map: &DofMap,
        rhs: &[Vec<f64>],
        laptime: &mut Laptime<'_>,
    ) -> Result<Vec<Vec<f64>>, SolveError> {
        for b in rhs {
            if b.len() != map.full_size() {
                return Err(SolveError::DimensionMismatch {
                    expected: map.full_size(),
                    found: b.len(),
                });
            }
        }
        let reduced: Vec<Vec<f64>> = rhs.iter().map(|b| map.reduce(b)).collect();
        let n = map.size();

        let solutions = match self.config.strategy {
            Strategy::Crs => {
                let crs = timed("ToCRS", laptime, || CrsMatrix::from_coo(coo, map));
                timed("Solve", laptime, || {
                    let factor = crs.factorize()?;
                    Self::substitute(&factor, &reduced)
                })?
            }
            Strategy::CrsCg => {
                let crs = timed("ToCRS", laptime, || CrsMatrix::from_coo(coo, map));
                timed("Solve", laptime, || self.iterate(&crs, &IdentityOperator(n), &reduced))?
            }
            Strategy::Lls => {
                let lls = timed("ToLLS", laptime, || LlsMatrix::from_coo(coo, map));
                timed("Solve", laptime, || {
                    let factor = lls.factorize()?;
                    Self::substitute(&factor, &reduced)
                })?
            }
            Strategy::LlsCg => {
                let lls = timed("ToLLS", laptime, || LlsMatrix::from_coo(coo, map));
                timed("Solve", laptime, || self.iterate(&lls, &IdentityOperator(n), &reduced))?
            }
            Strategy::LlsPcg => {
                let lls = timed("ToLLS", laptime, || LlsMatrix::from_coo(coo, map));
                timed("Solve", laptime, || {
                    let preconditioner = Preconditioner::new(&lls);
                    self.iterate(&lls, &preconditioner, &reduced)
                })?
            }
        };
        Ok(solutions.iter().map(|x| map.restore(x)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::testing::tridiagonal;
    use approx::assert_relative_eq;

    #[test]
    fn strategy_names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>(), Ok(strategy));
            assert_eq!(strategy.to_string(), strategy.name());
        }
        assert_eq!("lls_pcg".parse::<Strategy>(), Ok(Strategy::LlsPcg));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert_eq!(
            "SKYLINE".parse::<Strategy>(),
            Err(SolveError::UnknownStrategy("SKYLINE".to_string()))
        );
    }

    #[test]
    fn strategy_deserializes_from_its_name() {
        let strategy: Strategy = serde_json::from_str("\"CRS_CG\"").expect("known name");
        assert_eq!(strategy, Strategy::CrsCg);
    }

    #[test]
    fn every_strategy_solves_with_restraints() {
        let coo = tridiagonal(6, 4.0, -1.0);
        let conf = [false, false, true, false, false, false];
        let map = DofMap::new(&conf);
        let rhs = vec![vec![1.0, 2.0, 5.0, 3.0, 4.0, 5.0], vec![0.0, 1.0, 0.0, 0.0, 0.0, -1.0]];
        let reference = Solver::with_strategy(Strategy::Crs)
            .solve(&coo, &map, &rhs, &mut |_, _| ())
            .expect("spd");
        for strategy in Strategy::ALL {
            let mut phases = Vec::new();
            let solver = Solver::new(SolverConfig {
                strategy,
                epsilon: 1e-24,
                ..SolverConfig::default()
            });
            let solution = solver
                .solve(&coo, &map, &rhs, &mut |phase, _| phases.push(phase))
                .expect("spd");
            assert_eq!(solution.len(), 2);
            for (x, y) in solution.iter().zip(&reference) {
                assert_eq!(x[2], 0.0);
                for (a, b) in x.iter().zip(y) {
                    assert_relative_eq!(a, b, epsilon = 1e-10);
                }
            }
            assert_eq!(phases.last(), Some(&"Solve"));
        }
    }

    #[test]
    fn wrong_rhs_length_is_rejected() {
        let coo = tridiagonal(3, 4.0, -1.0);
        let map = DofMap::new(&[false; 3]);
        assert_eq!(
            Solver::default().solve(&coo, &map, &[vec![1.0]], &mut |_, _| ()),
            Err(SolveError::DimensionMismatch {
                expected: 3,
                found: 1
            })
        );
    }
}
