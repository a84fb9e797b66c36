//! Error types produced while reading, editing or analysing frames.

use thiserror::Error;

use crate::element::ElementId;
use crate::node::NodeId;
use crate::section::SectionId;

/// Error returned when the textual frame description cannot be turned into a
/// [`Frame`](crate::Frame).
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    /// Returned when a numeric token cannot be parsed.
    #[error("line {line}: cannot parse {field} from {token:?}")]
    Parse {
        /// One-based line number in the input.
        line: usize,
        /// Name of the field being read.
        field: &'static str,
        /// The offending token.
        token: String,
    },
    /// Returned when a line ends before a required field.
    #[error("line {line}: missing {field}")]
    MissingField {
        /// One-based line number in the input.
        line: usize,
        /// Name of the missing field.
        field: &'static str,
    },
    /// Returned when a record appears outside of any section header.
    #[error("line {line}: record outside of a section block")]
    Orphan {
        /// One-based line number in the input.
        line: usize,
    },
    /// Returned when an element refers to a section that has not been declared.
    #[error("element {element} refers to unknown section {section}")]
    UnknownSection {
        /// Number of the element.
        element: i64,
        /// Number of the missing section.
        section: i64,
    },
    /// Returned when an element or condition refers to a node that has not been declared.
    #[error("element {element} refers to unknown node {node}")]
    UnknownNode {
        /// Number of the referring element, or zero for a node condition line.
        element: i64,
        /// Number of the missing node.
        node: i64,
    },
    /// Returned when two entities of the same kind share a number.
    #[error("duplicate {kind} number {number}")]
    DuplicateNumber {
        /// Kind of entity ("section", "node" or "element").
        kind: &'static str,
        /// The repeated number.
        number: i64,
    },
    /// Returned when a well-formed record cannot be added to the frame.
    #[error("line {line}: {source}")]
    Rejected {
        /// One-based line number in the input.
        line: usize,
        /// Why the frame refused the record.
        #[source]
        source: FrameEditError,
    },
}

/// Error returned when editing a [`Frame`](crate::Frame) with ids it does not own.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FrameEditError {
    /// Returned when a node id is not part of the frame.
    #[error("node {0:?} is not part of this frame")]
    UnknownNode(NodeId),
    /// Returned when a section id is not part of the frame.
    #[error("section {0:?} is not part of this frame")]
    UnknownSection(SectionId),
    /// Returned when an element id is not part of the frame.
    #[error("element {0:?} is not part of this frame")]
    UnknownElement(ElementId),
    /// Returned when both ends of an element are the same node.
    #[error("element {element} starts and ends at node {node:?}")]
    SameEnds {
        /// Number of the element.
        element: i64,
        /// The repeated node.
        node: NodeId,
    },
}

/// Error returned by element-level mechanics.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ElementError {
    /// Returned when an element spans zero distance so its axes are undefined.
    #[error("element {element} has zero length")]
    ZeroLength {
        /// Number of the element.
        element: i64,
    },
    /// Returned when a condensed degree of freedom has no stiffness.
    #[error("element {element}: zero stiffness at condensed dof {dof}")]
    Singular {
        /// Number of the element.
        element: i64,
        /// Local degree of freedom being condensed.
        dof: usize,
    },
    /// Returned when the elastoplastic interaction matrix of both ends is singular.
    #[error("element {element}: singular plastic interaction matrix")]
    SingularPlastic {
        /// Number of the element.
        element: i64,
    },
}

/// Error returned by the sparse solvers.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SolveError {
    /// Returned when LDLᵀ meets a zero pivot.
    #[error("zero pivot at equation {row}; check supports and connectivity")]
    ZeroPivot {
        /// Equation (reduced row) of the pivot.
        row: usize,
    },
    /// Returned when an iterative solver exhausts its iteration budget.
    #[error("iterative solver did not converge in {iterations} iterations (residual {residual:e})")]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Squared residual norm at exit.
        residual: f64,
    },
    /// Returned when conjugate gradient meets a non-positive curvature.
    #[error("operator is not positive definite (iteration {iteration})")]
    Indefinite {
        /// Iteration at which the breakdown happened.
        iteration: usize,
    },
    /// Returned when the right-hand side does not match the system size.
    #[error("right-hand side has length {found}, expected {expected}")]
    DimensionMismatch {
        /// Size of the system.
        expected: usize,
        /// Length of the supplied vector.
        found: usize,
    },
    /// Returned when a strategy name is not recognised.
    #[error("unknown solver strategy {0:?}")]
    UnknownStrategy(String),
}

/// Error returned when an analysis cannot continue.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// Element mechanics failed.
    #[error(transparent)]
    Element(#[from] ElementError),
    /// The linear solve failed.
    #[error(transparent)]
    Solve(#[from] SolveError),
    /// Input could not be read.
    #[error(transparent)]
    Input(#[from] InputError),
    /// The frame was edited with foreign ids.
    #[error(transparent)]
    Edit(#[from] FrameEditError),
    /// The caller asked the driver to stop.
    #[error("analysis cancelled before lap {lap}")]
    Cancelled {
        /// The lap that was about to start.
        lap: usize,
    },
    /// A brittle failure persisted after every permitted step reduction.
    #[error("brittle failure at element {element} end {end} persists after step reduction")]
    BackoffExhausted {
        /// Number of the failing element.
        element: i64,
        /// End index (0 or 1).
        end: usize,
    },
    /// An outer fixed-point iteration did not settle.
    #[error("iteration did not settle after {iterations} passes")]
    NotConverged {
        /// Passes performed.
        iterations: usize,
    },
    /// The supplied parameters are inconsistent.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    /// Load vector length differs from six times the node count.
    #[error("load vector has length {found}, expected {expected}")]
    LoadLength {
        /// Expected length.
        expected: usize,
        /// Supplied length.
        found: usize,
    },
}
