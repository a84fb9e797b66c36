#![warn(clippy::pedantic)]

use std::sync::mpsc::channel;

use approx::assert_relative_eq;
use arclm::{
    arclm201, point, AnalysisConfig, AnalysisError, Element, ElementId, Event, Frame, Message,
    Recorder, Section, Solver, StepConfig, YieldEnvelope,
};

const E: f64 = 2.05e8;
const I: f64 = 8.33e-6;

fn plastic_section(limits: [f64; 6]) -> Section {
    Section::new(1, E, 0.3, [0.01, I, I, 1.67e-5]).with_envelope(
        YieldEnvelope::symmetric(limits),
        1.5,
        1.5,
    )
}

/// Beam fixed at `A`, propped at `C`, loaded at midspan `B`.
fn propped_beam() -> Frame {
    let mut frame = Frame::new();
    let s = frame.add_section(plastic_section([1e6, 1e6, 1e6, 1e6, 10.0, 1e6]));
    let a = frame.add_node(1, point(0.0, 0.0, 0.0));
    let b = frame.add_node(2, point(3.0, 0.0, 0.0));
    let c = frame.add_node(3, point(6.0, 0.0, 0.0));
    frame.set_conf(a, [true; 6]).expect("node exists");
    frame
        .set_conf(c, [true, true, true, false, false, false])
        .expect("node exists");
    frame.set_load(b, [0.0, 0.0, -10.0, 0.0, 0.0, 0.0]).expect("node exists");
    frame.add_element(Element::new(1, s, [a, b])).expect("valid element");
    frame.add_element(Element::new(2, s, [b, c])).expect("valid element");
    frame
}

fn run(frame: &mut Frame, config: &AnalysisConfig) -> (Result<(), AnalysisError>, Vec<Message>) {
    let (mut sender, receiver) = channel();
    let result = arclm201(frame, config, &Solver::default(), &mut sender);
    drop(sender);
    (result, receiver.into_iter().collect())
}

#[test]
fn hinges_form_at_the_support_then_under_the_load() {
    let mut frame = propped_beam();
    let (result, messages) = run(&mut frame, &AnalysisConfig::default());
    assert_eq!(result, Ok(()));
    assert_eq!(messages.last(), Some(&Message::End(Ok(()))));

    // The fixed end reaches the radius during the ninth lap.
    let first_yield = messages
        .iter()
        .position(|m| matches!(m, Message::Event(_)))
        .expect("a hinge forms");
    assert_eq!(messages[first_yield], Message::Event(Event::Yielded { element: 1, end: 0 }));
    let laps_before = messages[..first_yield]
        .iter()
        .filter(|m| matches!(m, Message::Lap(_)))
        .count();
    assert_eq!(laps_before, 8);

    // With the support hinged the midspan moment grows as in a simple beam.
    let last_lap = messages
        .iter()
        .rposition(|m| matches!(m, Message::Lap(_)))
        .expect("laps reported");
    let final_events: Vec<&Message> = messages[..last_lap]
        .iter()
        .rev()
        .take_while(|m| matches!(m, Message::Event(_)))
        .collect();
    assert!(final_events.contains(&&Message::Event(Event::Yielded { element: 1, end: 1 })));
    assert!(final_events.contains(&&Message::Event(Event::Yielded { element: 2, end: 0 })));

    let laps: Vec<_> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Lap(lap) => Some(*lap),
            _ => None,
        })
        .collect();
    assert_eq!(laps.len(), 10);
    assert_relative_eq!(laps[9].factor, 1.0, max_relative = 1e-12);
    for lap in &laps {
        assert!(lap.unbalance < 1e-6, "lap {} unbalance {}", lap.lap, lap.unbalance);
    }
    for pair in laps.windows(2) {
        assert!(pair[1].max_displacement > pair[0].max_displacement);
    }

    let support = frame.element(ElementId(0)).expect("element exists");
    assert_eq!(support.phinge, [true, true]);
    assert_eq!(support.bonds[4].code(), -1);
    assert!(support.energy > 0.0);
}

#[test]
fn brittle_shear_rolls_back_and_halves_the_step() {
    let mut frame = Frame::new();
    let s = frame.add_section(plastic_section([1e6, 5.0, 1e6, 1e6, 1e6, 1e6]));
    let a = frame.add_node(1, point(0.0, 0.0, 0.0));
    let b = frame.add_node(2, point(1.0, 0.0, 0.0));
    frame.set_conf(a, [true; 6]).expect("node exists");
    frame.set_load(b, [0.0, 4.5, 0.0, 0.0, 0.0, 0.0]).expect("node exists");
    frame.add_element(Element::new(1, s, [a, b])).expect("valid element");
    let config = AnalysisConfig {
        step: StepConfig {
            nlap: 1,
            ..StepConfig::default()
        },
        ..AnalysisConfig::default()
    };

    let (result, messages) = run(&mut frame, &config);
    assert_eq!(
        messages[0],
        Message::Event(Event::BrittleFailure { element: 1, end: 0 })
    );
    assert_eq!(
        messages[1],
        Message::Event(Event::BrittleFailure { element: 1, end: 1 })
    );
    match &messages[2] {
        Message::Lap(lap) => {
            assert_relative_eq!(lap.step, 0.5, max_relative = 1e-12);
            assert_relative_eq!(lap.factor, 0.5, max_relative = 1e-12);
        }
        other => panic!("expected a lap, got {other:?}"),
    }
    assert!(matches!(result, Err(AnalysisError::BackoffExhausted { element: 1, .. })));
    assert!(matches!(messages.last(), Some(Message::End(Err(_)))));
}

#[test]
fn brittle_back_off_uses_the_configured_safety_factor() {
    let mut frame = Frame::new();
    let s = frame.add_section(plastic_section([1e6, 5.0, 1e6, 1e6, 1e6, 1e6]));
    let a = frame.add_node(1, point(0.0, 0.0, 0.0));
    let b = frame.add_node(2, point(1.0, 0.0, 0.0));
    frame.set_conf(a, [true; 6]).expect("node exists");
    frame.set_load(b, [0.0, 4.5, 0.0, 0.0, 0.0, 0.0]).expect("node exists");
    frame.add_element(Element::new(1, s, [a, b])).expect("valid element");
    let config = AnalysisConfig {
        step: StepConfig {
            nlap: 1,
            safety: 0.8,
            max_backoff: 1,
            ..StepConfig::default()
        },
        ..AnalysisConfig::default()
    };

    let (result, messages) = run(&mut frame, &config);
    let laps: Vec<_> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Lap(lap) => Some(*lap),
            _ => None,
        })
        .collect();
    assert_eq!(laps.len(), 1);
    assert_relative_eq!(laps[0].step, 0.8, max_relative = 1e-12);
    assert_relative_eq!(laps[0].factor, 0.8, max_relative = 1e-12);
    // One reduction in the first lap uses up the allowance for the whole run.
    let failures = messages
        .iter()
        .filter(|m| matches!(m, Message::Event(Event::BrittleFailure { .. })))
        .count();
    assert_eq!(failures, 4);
    assert_eq!(
        result,
        Err(AnalysisError::BackoffExhausted { element: 1, end: 0 })
    );
}

fn column(geometric: bool) -> (Frame, Recorder) {
    let mut frame = Frame::new();
    let s = frame.add_section(Section::new(1, E, 0.3, [0.01, I, I, 1.67e-5]));
    let base = frame.add_node(1, point(0.0, 0.0, 0.0));
    let top = frame.add_node(2, point(0.0, 0.0, 3.0));
    frame.set_conf(base, [true; 6]).expect("node exists");
    frame.set_load(top, [1.0, 0.0, -200.0, 0.0, 0.0, 0.0]).expect("node exists");
    frame.add_element(Element::new(1, s, [base, top])).expect("valid element");
    let config = AnalysisConfig {
        step: StepConfig {
            geometric,
            ..StepConfig::default()
        },
        ..AnalysisConfig::default()
    };
    let mut recorder = Recorder::default();
    arclm201(&mut frame, &config, &Solver::default(), &mut recorder).expect("stable column");
    (frame, recorder)
}

#[test]
fn axial_compression_softens_the_column() {
    let (linear, _) = column(false);
    let (softened, recorder) = column(true);
    let sway = |frame: &Frame| frame.node(arclm::NodeId(1)).expect("node exists").disp[0];

    assert_relative_eq!(sway(&linear), 27.0 / (3.0 * E * I), max_relative = 1e-9);
    assert!(sway(&softened) > 1.15 * sway(&linear));
    assert!(recorder.events.is_empty());

    let element = softened.element(ElementId(0)).expect("element exists");
    assert!(element.energyb != 0.0);
    assert_eq!(linear.element(ElementId(0)).expect("element exists").energyb, 0.0);
}
