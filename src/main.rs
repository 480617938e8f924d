//! fastener-assembly - Screw and nut composite generator
//!
//! Reads `screw.stl` and `nut.stl` from the input directory and writes
//! `nut_and_screw_1.stl`, `nut_and_screw_2.stl` and `nut_and_screw_3.stl`
//! into the given output directory.

use clap::{CommandFactory, Parser};
use clap::error::ErrorKind;
use fastener_assembly::{
    AlignmentMode, DetectorConfig, Error, Pipeline, PipelineConfig, StlEncoding,
    head_detector::{DEFAULT_NUM_SLICES, DEFAULT_THRESHOLD_RATIO},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory that receives the three composite STL files
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Directory containing screw.stl and nut.stl
    #[arg(long, value_name = "DIR", default_value = "input")]
    input_dir: PathBuf,

    /// Number of slices scanned for the head transition
    #[arg(long, value_name = "N", default_value_t = DEFAULT_NUM_SLICES)]
    slices: usize,

    /// Diameter ratio that counts as the start of the head
    #[arg(long, value_name = "RATIO", default_value_t = DEFAULT_THRESHOLD_RATIO)]
    threshold: f64,

    /// Use the legacy coupled bottom alignment
    #[arg(long)]
    coupled_alignment: bool,

    /// Write ASCII STL instead of binary
    #[arg(long)]
    ascii: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let detector = DetectorConfig::new()
            .with_num_slices(self.slices)
            .with_threshold_ratio(self.threshold);

        PipelineConfig::new()
            .with_input_dir(&self.input_dir)
            .with_detector(detector)
            .with_alignment(if self.coupled_alignment {
                AlignmentMode::Coupled
            } else {
                AlignmentMode::Independent
            })
            .with_encoding(if self.ascii {
                StlEncoding::Ascii
            } else {
                StlEncoding::Binary
            })
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            // Usage errors exit with 1, not clap's default of 2
            let usage = Error::Usage(e.kind().to_string());
            eprintln!("Error: {}\n\n{}", usage, Args::command().render_usage());
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = Pipeline::new(args.pipeline_config()).and_then(|p| p.run(&args.output_dir));

    match result {
        Ok(report) => {
            for path in &report.outputs {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
