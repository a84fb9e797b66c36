use log::info;

use crate::admissibility::Admissibility;
use crate::assembly::{assemble, load_rhs, unbalanced_force};
use crate::config::AnalysisConfig;
use crate::element::ElementId;
use crate::errors::AnalysisError;
use crate::frame::Frame;
use crate::solver::LinearSolver;
use crate::stiffness::TangentOptions;

use super::{finish, laptime, norm, report_changes, warn_unsupported, EventSink, LapResult};

/// Linear analysis on lift-off soil springs.
///
/// Elements whose section number appears in `config.soil.sections` become
/// compression-only springs. Each pass solves the full nodal load from the
/// undeformed state with the springs that are currently in contact, then
/// lets every spring lift off or touch down again. The iteration stops once
/// no spring changed and the displacements moved by at most
/// `config.soil.epsilon` relative to their size.
///
/// Every pass is reported as one lap.
///
/// # Errors
///
/// Returns [`AnalysisError::NotConverged`] after `config.soil.max_iterations`
/// passes, [`AnalysisError::Cancelled`] when the sink asks to stop, and any
/// element or solver error.
pub fn arclm301(
    frame: &mut Frame,
    config: &AnalysisConfig,
    solver: &dyn LinearSolver,
    sink: &mut dyn EventSink,
) -> Result<(), AnalysisError> {
    let result = run(frame, config, solver, sink);
    finish(sink, result)
}

fn run(
    frame: &mut Frame,
    config: &AnalysisConfig,
    solver: &dyn LinearSolver,
    sink: &mut dyn EventSink,
) -> Result<(), AnalysisError> {
    let soil = &config.soil;
    let springs = mark_springs(frame, &soil.sections, soil.threshold);
    info!("{springs} soil spring(s) on sections {:?}", soil.sections);
    frame.reset()?;
    warn_unsupported(frame);

    let loads = frame.load_vector();
    let map = solver.dof_map(frame);
    let options = TangentOptions::default();
    let mut previous: Option<Vec<f64>> = None;

    for pass in 1..=soil.max_iterations {
        if sink.cancelled() {
            return Err(AnalysisError::Cancelled { lap: pass });
        }
        let validity = frame.validity();
        frame.reset()?;
        frame.restore_validity(&validity);

        let coo = assemble(frame, options)?;
        let rhs = load_rhs(frame, &loads, 1.0, true)?;
        let mut solutions = solver.solve(&coo, &map, &[rhs], &mut laptime(sink))?;
        let du = solutions.swap_remove(0);
        frame.apply_increment(&du, &loads, 1.0, options)?;

        let changes = frame.check_admissibility();
        report_changes(frame, &changes, sink);
        sink.on_lap(&LapResult {
            lap: pass,
            factor: 1.0,
            step: 1.0,
            max_displacement: frame.max_displacement(),
            unbalance: norm(&unbalanced_force(frame, 1.0)?),
        });

        let settled = match &previous {
            None => true,
            Some(previous) => {
                let change: Vec<f64> = du.iter().zip(previous).map(|(a, b)| a - b).collect();
                norm(&change) <= soil.epsilon * norm(&du)
            }
        };
        if changes.is_empty() && settled {
            info!("soil springs settled after {pass} pass(es)");
            return Ok(());
        }
        previous = Some(du);
    }
    Err(AnalysisError::NotConverged {
        iterations: soil.max_iterations,
    })
}

/// Turn the elements on `sections` into lift-off springs; returns how many.
fn mark_springs(frame: &mut Frame, sections: &[i64], threshold: f64) -> usize {
    let ids: Vec<ElementId> = frame
        .views()
        .filter(|(_, view)| sections.contains(&view.section.num))
        .map(|(id, _)| id)
        .collect();
    for id in &ids {
        if let Some(element) = frame.element_mut(*id) {
            element.check = Admissibility::TensionFree { threshold };
        }
    }
    ids.len()
}
