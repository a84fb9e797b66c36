mod analysis;
mod conditions;
mod report;

use analysis::run_analysis;
use arclm::{read_frame, AnalysisConfig};
use conditions::{build_portal, PortalProperties};
use report::render_summary;
use std::error::Error;
use std::fs::{self, File};

fn main() -> Result<(), Box<dyn Error>> {
    // Usage: arclm [frame.txt [config.json]]
    let mut args = std::env::args().skip(1);

    // Without an input file, analyse the built-in portal frame.
    let mut frame = match args.next() {
        Some(path) => read_frame(&fs::read_to_string(path)?)?,
        None => build_portal(&PortalProperties::default())?.0,
    };
    let config = match args.next() {
        Some(path) => AnalysisConfig::from_reader(File::open(path)?)?,
        None => AnalysisConfig::default(),
    };

    let summary = run_analysis(&mut frame, &config)?;
    println!("{}", render_summary(&summary));

    Ok(())
}
