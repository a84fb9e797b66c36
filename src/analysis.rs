use arclm::{
    arclm001, arclm201, AnalysisConfig, AnalysisError, Event, Frame, LapResult, Recorder, Solver,
};

/// Response of one node after the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeResult {
    /// Node number.
    pub num: i64,
    /// Displacements and rotations.
    pub disp: [f64; 6],
    /// Support reactions; zero at free degrees of freedom.
    pub reaction: [f64; 6],
}

/// End forces of one element in local axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementResult {
    /// Element number.
    pub num: i64,
    /// End forces, six per end.
    pub stress: [f64; 12],
    /// Plastic hinge flags of both ends.
    pub hinges: [bool; 2],
}

/// Everything the report prints.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    /// Largest translation of the linear solution.
    pub linear_max_displacement: f64,
    /// Laps of the elastoplastic run.
    pub laps: Vec<LapResult>,
    /// Hinges and failures in the order they happened.
    pub events: Vec<Event>,
    /// How the elastoplastic run ended.
    pub outcome: Result<(), String>,
    /// Nodes at the end of the elastoplastic run.
    pub nodes: Vec<NodeResult>,
    /// Elements at the end of the elastoplastic run.
    pub elements: Vec<ElementResult>,
}

/// Solve the frame linearly, then step the same load elastoplastically.
///
/// A failure of the linear solve is returned as an error; the elastoplastic
/// run reports its outcome in the summary so the partial response can still
/// be printed.
pub fn run_analysis(
    frame: &mut Frame,
    config: &AnalysisConfig,
) -> Result<AnalysisSummary, AnalysisError> {
    let solver = Solver::new(config.solver.clone());

    arclm001(frame, &[], config, &solver, &mut Recorder::default())?;
    let linear_max_displacement = frame.max_displacement();

    let mut recorder = Recorder::default();
    let outcome = arclm201(frame, config, &solver, &mut recorder).map_err(|e| e.to_string());

    let nodes = frame
        .nodes()
        .iter()
        .map(|node| NodeResult {
            num: node.num,
            disp: node.disp,
            reaction: node.reaction,
        })
        .collect();
    let elements = frame
        .elements()
        .iter()
        .map(|element| ElementResult {
            num: element.num,
            stress: element.stress,
            hinges: element.phinge,
        })
        .collect();

    Ok(AnalysisSummary {
        linear_max_displacement,
        laps: recorder.laps,
        events: recorder.events,
        outcome,
        nodes,
        elements,
    })
}
