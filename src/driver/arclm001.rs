use log::info;

use crate::assembly::{assemble, load_rhs, unbalanced_force};
use crate::config::AnalysisConfig;
use crate::errors::AnalysisError;
use crate::frame::Frame;
use crate::solver::LinearSolver;
use crate::stiffness::TangentOptions;

use super::{finish, laptime, norm, report_changes, warn_unsupported, EventSink, LapResult};

/// Linear static analysis.
///
/// Every vector in `loads` (length `6N`) is solved against the same
/// stiffness; an empty slice means the nodal forces stored in the frame.
/// Member loads enter the first case only. The frame receives the
/// displacements, end forces and reactions of the first case; the
/// displacements of all cases are returned.
///
/// When elements carry admissibility rules, the analysis is repeated from
/// the undeformed state until no element is deleted or restored, for at most
/// `config.soil.max_iterations` passes.
///
/// # Errors
///
/// Returns [`AnalysisError::LoadLength`] for a load vector of the wrong
/// length, [`AnalysisError::NotConverged`] when admissibility keeps changing,
/// and any element or solver error.
pub fn arclm001(
    frame: &mut Frame,
    loads: &[Vec<f64>],
    config: &AnalysisConfig,
    solver: &dyn LinearSolver,
    sink: &mut dyn EventSink,
) -> Result<Vec<Vec<f64>>, AnalysisError> {
    let result = run(frame, loads, config, solver, sink);
    finish(sink, result)
}

fn run(
    frame: &mut Frame,
    loads: &[Vec<f64>],
    config: &AnalysisConfig,
    solver: &dyn LinearSolver,
    sink: &mut dyn EventSink,
) -> Result<Vec<Vec<f64>>, AnalysisError> {
    let cases = if loads.is_empty() {
        vec![frame.load_vector()]
    } else {
        loads.to_vec()
    };
    for case in &cases {
        if case.len() != frame.dof_count() {
            return Err(AnalysisError::LoadLength {
                expected: frame.dof_count(),
                found: case.len(),
            });
        }
    }
    if sink.cancelled() {
        return Err(AnalysisError::Cancelled { lap: 1 });
    }

    frame.reset()?;
    warn_unsupported(frame);
    let map = solver.dof_map(frame);
    let checked = frame.elements().iter().any(|e| e.check.is_active());
    let passes = if checked { config.soil.max_iterations.max(1) } else { 1 };
    let options = TangentOptions::default();

    for pass in 1..=passes {
        let coo = assemble(frame, options)?;
        let rhs = cases
            .iter()
            .enumerate()
            .map(|(i, case)| load_rhs(frame, case, 1.0, i == 0))
            .collect::<Result<Vec<_>, _>>()?;
        let solutions = solver.solve(&coo, &map, &rhs, &mut laptime(sink))?;
        frame.apply_increment(&solutions[0], &cases[0], 1.0, options)?;

        let changes = if checked {
            frame.check_admissibility()
        } else {
            Vec::new()
        };
        report_changes(frame, &changes, sink);
        if changes.is_empty() {
            let unbalance = norm(&unbalanced_force(frame, 1.0)?);
            info!("linear analysis done after {pass} pass(es)");
            sink.on_lap(&LapResult {
                lap: 1,
                factor: 1.0,
                step: 1.0,
                max_displacement: frame.max_displacement(),
                unbalance,
            });
            return Ok(solutions);
        }

        let validity = frame.validity();
        frame.reset()?;
        frame.restore_validity(&validity);
    }
    Err(AnalysisError::NotConverged { iterations: passes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Event, Recorder};
    use crate::element::Element;
    use crate::geometry::point;
    use crate::section::Section;
    use crate::solver::Solver;
    use approx::assert_relative_eq;

    fn braced_column() -> Frame {
        let mut frame = Frame::new();
        let column = frame.add_section(Section::new(
            1,
            2.05e8,
            0.3,
            [0.01, 8.33e-6, 8.33e-6, 1.67e-5],
        ));
        let brace = frame.add_section(Section::new(2, 2.05e8, 0.3, [0.001, 1e-9, 1e-9, 1e-9]));
        let base = frame.add_node(1, point(0.0, 0.0, 0.0));
        let top = frame.add_node(2, point(0.0, 0.0, 3.0));
        let anchor = frame.add_node(3, point(4.0, 0.0, 0.0));
        frame.set_conf(base, [true; 6]).expect("node exists");
        frame.set_conf(anchor, [true; 6]).expect("node exists");
        frame.add_element(Element::new(1, column, [base, top])).expect("valid element");
        let mut tie = Element::new(2, brace, [anchor, top]);
        tie.set_incompressible(0.0);
        frame.add_element(tie).expect("valid element");
        frame
    }

    #[test]
    fn compressed_tie_is_removed() {
        let mut frame = braced_column();
        let top = frame.find_node(2).expect("node exists");
        // Pushing towards the anchor shortens the tie.
        frame.set_load(top, [10.0, 0.0, 0.0, 0.0, 0.0, 0.0]).expect("node exists");
        let mut recorder = Recorder::default();
        arclm001(&mut frame, &[], &AnalysisConfig::default(), &Solver::default(), &mut recorder)
            .expect("stable frame");
        assert_eq!(recorder.events, vec![Event::Deleted { element: 2 }]);
        assert_eq!(recorder.laps.len(), 1);
        assert_eq!(recorder.outcome, Some(Ok(())));
        let column = frame.element(crate::ElementId(0)).expect("element exists");
        let base = frame.node(crate::NodeId(0)).expect("node exists");
        // The column alone takes the full shear.
        assert_relative_eq!(base.reaction[0], -10.0, max_relative = 1e-9);
        assert_relative_eq!(column.stress[0].abs(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn stretched_tie_stays() {
        let mut frame = braced_column();
        let top = frame.find_node(2).expect("node exists");
        frame.set_load(top, [-10.0, 0.0, 0.0, 0.0, 0.0, 0.0]).expect("node exists");
        let mut recorder = Recorder::default();
        arclm001(&mut frame, &[], &AnalysisConfig::default(), &Solver::default(), &mut recorder)
            .expect("stable frame");
        assert!(recorder.events.is_empty());
        let tie = frame.element(crate::ElementId(1)).expect("element exists");
        assert!(tie.is_valid);
        assert!(tie.stress[0] < 0.0);
    }

    #[test]
    fn several_cases_share_one_factorisation() {
        let mut frame = braced_column();
        let n = frame.dof_count();
        let mut x = vec![0.0; n];
        x[6] = -1.0;
        let mut y = vec![0.0; n];
        y[7] = 1.0;
        let mut recorder = Recorder::default();
        let solutions = arclm001(
            &mut frame,
            &[x, y],
            &AnalysisConfig::default(),
            &Solver::default(),
            &mut recorder,
        )
        .expect("stable frame");
        assert_eq!(solutions.len(), 2);
        assert!(solutions[1][7] > 0.0);
        assert_eq!(solutions[0][0], 0.0);
        assert_eq!(recorder.phases, vec!["ToLLS", "Solve"]);
    }

    #[test]
    fn wrong_load_length_is_rejected() {
        let mut frame = braced_column();
        let mut recorder = Recorder::default();
        let result = arclm001(
            &mut frame,
            &[vec![0.0; 3]],
            &AnalysisConfig::default(),
            &Solver::default(),
            &mut recorder,
        );
        assert_eq!(
            result,
            Err(AnalysisError::LoadLength {
                expected: 18,
                found: 3
            })
        );
        assert!(matches!(recorder.outcome, Some(Err(_))));
    }
}
