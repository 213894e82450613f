use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use bes_exp::{load_config, progress_line, run_sweep, ProcessEngine, SimulationEngine};
use clap::Args;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML sweep configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Override the configured worker pool size.
    #[arg(long)]
    pub workers: Option<usize>,
    /// Override the configured per-run engine timeout.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(&args.config)?;
    if let Some(workers) = args.workers {
        config = config.with_workers(workers)?;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config = config.with_timeout_secs(timeout_secs)?;
    }
    tracing::info!(
        workers = config.workers,
        timeout_secs = config.engine.timeout_secs,
        containerized = config.engine.container.is_some(),
        "starting sweep"
    );

    let engine: Arc<dyn SimulationEngine> = Arc::new(ProcessEngine::from_config(&config));
    let config = Arc::new(config);
    let outcome = run_sweep(Arc::clone(&config), engine, |position, total, record| {
        println!("{}", progress_line(position, total, record));
    })
    .inspect_err(|err| tracing::error!(error = %err, "sweep failed"))?;

    println!(
        "Valid runs: {}/{}",
        outcome.summary.jobs_valid, outcome.summary.jobs_total
    );
    println!("Dataset: {}", config.dataset_path.display());
    println!("Elapsed: {:.0}s", outcome.summary.elapsed_secs);
    Ok(())
}
