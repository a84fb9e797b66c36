use log::{info, warn};

use crate::assembly::{assemble, load_rhs, unbalanced_force};
use crate::config::AnalysisConfig;
use crate::element::ElementId;
use crate::errors::AnalysisError;
use crate::frame::Frame;
use crate::plasticity::{coefficients, EndState};
use crate::solver::LinearSolver;
use crate::stiffness::TangentOptions;

use super::{finish, laptime, norm, warn_unsupported, Event, EventSink, LapResult};

/// Load-stepped elastoplastic analysis.
///
/// The load factor runs from `config.step.start` to `config.step.max` in
/// steps of `(max - start) / nlap` applied to the nodal forces stored in the
/// frame. After each lap every element end is checked against
/// `config.material`:
///
/// * a brittle shear failure rolls the lap back and retries it with the step
///   scaled by `safety`;
/// * a yielded end becomes a plastic hinge and the lap is kept; later laps
///   condense the hinge into the tangent.
///
/// The sink is polled for cancellation before every lap.
///
/// # Errors
///
/// Returns [`AnalysisError::BackoffExhausted`] once more than `max_backoff`
/// step reductions were needed, [`AnalysisError::Cancelled`] when the sink
/// asks to stop, [`AnalysisError::InvalidParameters`] for unusable stepping
/// parameters, and any element or solver error. The frame is left at the
/// last completed lap.
pub fn arclm201(
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
    let step = &config.step;
    step.validate()?;
    if step.init {
        frame.reset()?;
    } else {
        frame.update_axes()?;
    }
    warn_unsupported(frame);

    let loads = frame.load_vector();
    let map = solver.dof_map(frame);
    let options = TangentOptions {
        geometric: step.geometric,
        plastic: true,
        material: config.material,
    };
    let limit = step.max - 1e-12 * step.max.abs().max(1.0);
    let mut factor = step.start;
    let mut delta = step.step();
    let mut backoffs = 0;
    let mut lap = 0;

    while factor < limit {
        if sink.cancelled() {
            return Err(AnalysisError::Cancelled { lap: lap + 1 });
        }
        lap += 1;
        loop {
            let increment = delta.min(step.max - factor);
            let state = frame.snapshot();
            let coo = assemble(frame, options)?;
            let rhs = load_rhs(frame, &loads, increment, true)?;
            let mut solutions = solver.solve(&coo, &map, &[rhs], &mut laptime(sink))?;
            let du = solutions.swap_remove(0);
            frame.apply_increment(&du, &loads, factor + increment, options)?;

            let (brittle, yielded) = classify(frame, config);
            if let Some(&(id, end)) = brittle.first() {
                frame.restore(&state);
                for (id, end) in &brittle {
                    let num = element_num(frame, *id);
                    warn!(
                        "element {num} end {end}: brittle shear failure at factor {:.6}",
                        factor + increment
                    );
                    sink.on_event(&Event::BrittleFailure { element: num, end: *end });
                }
                backoffs += 1;
                if backoffs > step.max_backoff {
                    return Err(AnalysisError::BackoffExhausted {
                        element: element_num(frame, id),
                        end,
                    });
                }
                delta *= step.safety;
                continue;
            }

            for (id, end, slot) in yielded {
                let num = element_num(frame, id);
                if let Some(element) = frame.element_mut(id) {
                    element.yield_at(end, slot);
                }
                info!("element {num} end {end}: yielded at factor {:.6}", factor + increment);
                sink.on_event(&Event::Yielded { element: num, end });
            }

            factor += increment;
            let unbalance = norm(&unbalanced_force(frame, factor)?);
            sink.on_lap(&LapResult {
                lap,
                factor,
                step: increment,
                max_displacement: frame.max_displacement(),
                unbalance,
            });
            break;
        }
    }
    Ok(())
}

type Brittle = Vec<(ElementId, usize)>;
type Yielded = Vec<(ElementId, usize, usize)>;

/// Brittle ends and newly yielded ends, in element order.
fn classify(frame: &Frame, config: &AnalysisConfig) -> (Brittle, Yielded) {
    let mut brittle = Vec::new();
    let mut yielded = Vec::new();
    for (id, view) in frame.views() {
        if !view.element.is_valid || view.section.is_rigid() {
            continue;
        }
        let c = coefficients(&view, &config.material);
        for end in 0..2 {
            match c.classify(end, &config.material) {
                EndState::Brittle { .. } => brittle.push((id, end)),
                EndState::Yielded { slot } if !view.element.phinge[end] => {
                    yielded.push((id, end, slot));
                }
                _ => (),
            }
        }
    }
    (brittle, yielded)
}

fn element_num(frame: &Frame, id: ElementId) -> i64 {
    frame.element(id).map_or(0, |e| e.num)
}
