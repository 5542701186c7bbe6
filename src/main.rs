//! Tiger semantic checker
//!
//! Reads a parsed Tiger program (the AST as JSON) and reports type and
//! scope errors.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use tiger_sema::{analyze, AnalysisFeedback, Root};

/// Tiger semantic checker
#[derive(Parser, Debug)]
#[command(name = "tigerc")]
#[command(version = "0.1.0")]
#[command(about = "Type checking and scope resolution for Tiger programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a program for errors
    Check {
        /// AST of the program, as JSON
        input: PathBuf,

        /// Print a JSON report on stdout instead of plain diagnostics
        #[arg(long)]
        json: bool,
    },
    /// Print version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Check { input, json } => match check_file(input, *json) {
            Ok(true) => {}
            Ok(false) => process::exit(1),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                process::exit(2);
            }
        },
        Commands::Version => {
            println!("tigerc 0.1.0");
            println!("Tiger semantic checker");
        }
    }
}

/// Check one file; `Ok(false)` when the program has semantic errors
fn check_file(input: &Path, json: bool) -> Result<bool> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let root: Root = serde_json::from_str(&source)
        .with_context(|| format!("{} is not a valid Tiger AST", input.display()))?;
    log::info!("checking {}", input.display());

    let start = Instant::now();
    let analysis = analyze(&root);
    let elapsed = start.elapsed().as_millis() as u64;

    if json {
        let feedback = AnalysisFeedback::from_analysis(&analysis, &input.to_string_lossy(), elapsed);
        println!("{}", feedback.to_json());
    } else if analysis.has_error() {
        eprint!("{}", analysis.diagnostics);
    } else {
        println!("✅ No errors found");
    }

    Ok(!analysis.has_error())
}
