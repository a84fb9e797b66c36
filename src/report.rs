use crate::analysis::AnalysisSummary;
use arclm::Event;
use std::fmt::Write;

/// Render a textual summary of the analysis.
///
/// Displacements and reactions are in global axes; element end forces are
/// in local axes with compression positive at the first end.
#[must_use]
pub fn render_summary(summary: &AnalysisSummary) -> String {
    let mut output = String::new();
    write_summary(&mut output, summary).expect("writing to string cannot fail");
    output
}

fn write_summary(output: &mut String, summary: &AnalysisSummary) -> std::fmt::Result {
    writeln!(
        output,
        "Linear analysis: max displacement = {:.4e}",
        summary.linear_max_displacement
    )?;

    writeln!(output, "\nElastoplastic analysis")?;
    writeln!(
        output,
        "{:>4} {:>10} {:>10} {:>12} {:>12}",
        "lap", "factor", "step", "max disp", "unbalance"
    )?;
    for lap in &summary.laps {
        writeln!(
            output,
            "{:>4} {:>10.4} {:>10.4} {:>12.4e} {:>12.3e}",
            lap.lap, lap.factor, lap.step, lap.max_displacement, lap.unbalance
        )?;
    }
    for event in &summary.events {
        match event {
            Event::Yielded { element, end } => {
                writeln!(output, "hinge at element {element} end {end}")?;
            }
            Event::BrittleFailure { element, end } => {
                writeln!(output, "brittle shear at element {element} end {end}")?;
            }
            Event::Deleted { element } => writeln!(output, "element {element} removed")?,
            Event::Restored { element } => writeln!(output, "element {element} restored")?,
        }
    }
    match &summary.outcome {
        Ok(()) => writeln!(output, "completed")?,
        Err(message) => writeln!(output, "stopped: {message}")?,
    }

    writeln!(output, "\nNode displacements")?;
    for node in &summary.nodes {
        writeln!(output, "{:>6} {}", node.num, row(&node.disp, "e"))?;
    }

    writeln!(output, "\nReactions")?;
    for node in summary.nodes.iter().filter(|n| n.reaction.iter().any(|r| *r != 0.0)) {
        writeln!(output, "{:>6} {}", node.num, row(&node.reaction, "f"))?;
    }

    writeln!(output, "\nElement end forces (N Qx Qy Mz Mx My)")?;
    for element in &summary.elements {
        for end in 0..2 {
            let forces = &element.stress[6 * end..6 * end + 6];
            let hinge = if element.hinges[end] { " hinge" } else { "" };
            writeln!(output, "{:>6}.{end} {}{hinge}", element.num, row(forces, "f"))?;
        }
    }
    Ok(())
}

fn row(values: &[f64], style: &str) -> String {
    values
        .iter()
        .map(|v| {
            if style == "e" {
                format!("{v:>12.4e}")
            } else {
                format!("{v:>10.3}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
