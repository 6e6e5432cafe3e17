//! Command-line driver: parse a module, run one analysis per function,
//! print the per-instruction dumps.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use meander_core::analysis::{run_named, AnalysisKind};
use meander_core::ir::parse_module;

#[derive(Debug, Parser)]
#[command(name = "meander", version, about = "Dataflow analyses over a textual CFG IR")]
struct Cli {
    /// File containing one or more functions in the textual IR form.
    input: PathBuf,

    /// Analysis to run: avail-expr, liveness, or const-prop.
    #[arg(short, long)]
    analysis: AnalysisKind,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let functions = parse_module(&source)
        .with_context(|| format!("parsing {}", cli.input.display()))?;
    debug!(functions = functions.len(), analysis = %cli.analysis, "module parsed");

    for (i, function) in functions.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("; {} of fn {}", cli.analysis, function.name);
        print!("{}", run_named(cli.analysis, function));
    }
    Ok(())
}
