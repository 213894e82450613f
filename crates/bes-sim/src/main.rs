use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    doctor::{self, DoctorArgs},
    extract::{self, ExtractArgs},
    plan::{self, PlanArgs},
    run::{self, RunArgs},
};

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "bes-sim", about = "Building energy parameter sweep CLI")]
struct Cli {
    /// Log level for the sweep crates when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand a configuration into its job list without running anything.
    Plan(PlanArgs),
    /// Run every job of a sweep and write the aggregated dataset.
    Run(RunArgs),
    /// Read the metrics of a single existing result store.
    Extract(ExtractArgs),
    /// Check the measures directory for layout problems.
    Doctor(DoctorArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;
    match cli.command {
        Command::Plan(args) => plan::run(&args),
        Command::Run(args) => run::run(&args),
        Command::Extract(args) => extract::run(&args),
        Command::Doctor(args) => doctor::run(&args),
    }
}
