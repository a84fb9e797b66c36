#![warn(clippy::all)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod admissibility;
pub mod assembly;
pub mod bond;
pub mod config;
pub mod driver;
pub mod element;
pub mod errors;
pub mod frame;
pub mod geometry;
pub mod input;
pub mod node;
pub mod plasticity;
pub mod section;
pub mod solver;
pub mod sparse;
pub mod stiffness;

pub use admissibility::{Admissibility, AdmissibilityCheck, CheckOutcome, CheckState};
pub use bond::Bond;
pub use config::{AnalysisConfig, MaterialLaw, SoilConfig, SolverConfig, StepConfig};
pub use driver::{
    arclm001, arclm201, arclm301, Event, EventSink, LapResult, LogSink, Message, Recorder,
};
pub use element::{Element, ElementId, ElementView};
pub use errors::{AnalysisError, ElementError, FrameEditError, InputError, SolveError};
pub use frame::{Frame, FrameState};
pub use geometry::{point, Point};
pub use input::read_frame;
pub use node::{Node, NodeId};
pub use section::{Section, SectionId, YieldEnvelope};
pub use solver::{LinearSolver, Solver, Strategy};
