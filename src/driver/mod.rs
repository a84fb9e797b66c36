//! Analysis drivers and the sink they report to.
//!
//! * [`arclm001`]: linear static analysis for one or more load cases.
//! * [`arclm201`]: load-stepped elastoplastic analysis with plastic hinges
//!   and step back-off on brittle shear failure.
//! * [`arclm301`]: fixed-point iteration on lift-off soil springs.
//!
//! Each driver mutates the [`Frame`](crate::Frame) in place and pushes lap
//! results and state-change events into an [`EventSink`].

mod arclm001;
mod arclm201;
mod arclm301;

use std::sync::mpsc::Sender;
use std::time::Duration;

use log::{debug, info, warn};

pub use arclm001::arclm001;
pub use arclm201::arclm201;
pub use arclm301::arclm301;

use crate::admissibility::CheckOutcome;
use crate::element::ElementId;
use crate::errors::AnalysisError;
use crate::frame::Frame;

/// Summary of a completed lap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LapResult {
    /// One-based lap number.
    pub lap: usize,
    /// Total load factor after the lap.
    pub factor: f64,
    /// Load factor increment applied in the lap.
    pub step: f64,
    /// Largest absolute nodal translation.
    pub max_displacement: f64,
    /// Euclidean norm of the out-of-balance force.
    pub unbalance: f64,
}

/// State change observed during a lap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// An element end reached the yield surface and became a plastic hinge.
    Yielded {
        /// Element number.
        element: i64,
        /// End index (0 or 1).
        end: usize,
    },
    /// Shear at an element end exceeded the brittle limit.
    BrittleFailure {
        /// Element number.
        element: i64,
        /// End index (0 or 1).
        end: usize,
    },
    /// An admissibility rule took an element out of the structure.
    Deleted {
        /// Element number.
        element: i64,
    },
    /// An admissibility rule put an element back.
    Restored {
        /// Element number.
        element: i64,
    },
}

/// Receiver of driver progress.
///
/// Every method has a default, so implementors only override what they use.
pub trait EventSink {
    /// Called after every completed lap.
    fn on_lap(&mut self, _result: &LapResult) {}

    /// Called for every state change, in element order within a lap.
    fn on_event(&mut self, _event: &Event) {}

    /// Called once when the driver returns.
    fn on_end(&mut self, _result: Result<(), &AnalysisError>) {}

    /// Wall-clock time of a solver phase (`ToCRS`, `ToLLS` or `Solve`).
    fn on_laptime(&mut self, _phase: &'static str, _elapsed: Duration) {}

    /// Polled before each lap; returning `true` stops the driver.
    fn cancelled(&self) -> bool {
        false
    }
}

/// Sink that only writes log lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_lap(&mut self, result: &LapResult) {
        info!(
            "lap {}: factor {:.6}, step {:.6}, max displacement {:.6e}, unbalance {:.3e}",
            result.lap, result.factor, result.step, result.max_displacement, result.unbalance
        );
    }

    fn on_end(&mut self, result: Result<(), &AnalysisError>) {
        match result {
            Ok(()) => info!("analysis completed"),
            Err(e) => warn!("analysis stopped: {e}"),
        }
    }
}

/// Sink that keeps everything it receives.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recorder {
    /// Completed laps.
    pub laps: Vec<LapResult>,
    /// Events in arrival order.
    pub events: Vec<Event>,
    /// Outcome reported by `on_end`, with the error rendered as text.
    pub outcome: Option<Result<(), String>>,
    /// Solver phases in arrival order.
    pub phases: Vec<&'static str>,
    /// Request cancellation once this many laps have completed.
    pub cancel_after: Option<usize>,
}

impl EventSink for Recorder {
    fn on_lap(&mut self, result: &LapResult) {
        self.laps.push(*result);
    }

    fn on_event(&mut self, event: &Event) {
        self.events.push(*event);
    }

    fn on_end(&mut self, result: Result<(), &AnalysisError>) {
        self.outcome = Some(result.map_err(ToString::to_string));
    }

    fn on_laptime(&mut self, phase: &'static str, _elapsed: Duration) {
        self.phases.push(phase);
    }

    fn cancelled(&self) -> bool {
        self.cancel_after.map_or(false, |n| self.laps.len() >= n)
    }
}

/// Message forwarded by the channel sink.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// A completed lap.
    Lap(LapResult),
    /// A state change.
    Event(Event),
    /// The driver returned; the error is rendered as text.
    End(Result<(), String>),
}

impl EventSink for Sender<Message> {
    fn on_lap(&mut self, result: &LapResult) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.send(Message::Lap(*result));
    }

    fn on_event(&mut self, event: &Event) {
        let _ = self.send(Message::Event(*event));
    }

    fn on_end(&mut self, result: Result<(), &AnalysisError>) {
        let _ = self.send(Message::End(result.map_err(ToString::to_string)));
    }
}

/// Report the outcome of a driver run to the sink and pass it on.
fn finish<T>(
    sink: &mut dyn EventSink,
    result: Result<T, AnalysisError>,
) -> Result<T, AnalysisError> {
    sink.on_end(result.as_ref().map(|_| ()));
    result
}

/// Warn about parts of the frame that nothing holds in place.
fn warn_unsupported(frame: &Frame) {
    for island in frame.unsupported_islands() {
        let numbers: Vec<i64> = island
            .iter()
            .filter_map(|id| frame.node(*id).map(|n| n.num))
            .collect();
        warn!("nodes {numbers:?} have no support; the stiffness will be singular");
    }
}

/// Turn admissibility changes into events, logging each.
fn report_changes(frame: &Frame, changes: &[(ElementId, CheckOutcome)], sink: &mut dyn EventSink) {
    for (id, outcome) in changes {
        let Some(element) = frame.element(*id) else {
            continue;
        };
        let event = match outcome {
            CheckOutcome::Deleted => Event::Deleted {
                element: element.num,
            },
            CheckOutcome::Restored => Event::Restored {
                element: element.num,
            },
            CheckOutcome::AsIs => continue,
        };
        info!("element {}: {outcome:?}", element.num);
        sink.on_event(&event);
    }
}

/// Euclidean norm.
fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Forward solver phase timings to the sink.
fn laptime(sink: &mut dyn EventSink) -> impl FnMut(&'static str, Duration) + '_ {
    move |phase, elapsed| {
        debug!("{phase} took {elapsed:?}");
        sink.on_laptime(phase, elapsed);
    }
}
