use std::error::Error;
use std::fs;
use std::path::PathBuf;

use bes_exp::{expand, load_config, to_canonical_json_bytes, Job};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// YAML sweep configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Write the plan here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PlanReport {
    plan_hash: String,
    job_count: usize,
    jobs: Vec<Job>,
}

pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config)?;
    let jobs = expand(&config.sweep);
    tracing::info!(jobs = jobs.len(), "generated grid");
    let report = PlanReport {
        plan_hash: config.plan_hash.clone(),
        job_count: jobs.len(),
        jobs,
    };
    let bytes = to_canonical_json_bytes(&report)?;
    match &args.out {
        Some(path) => fs::write(path, bytes)?,
        None => println!("{}", String::from_utf8(bytes)?),
    }
    Ok(())
}
