use std::fs;
use std::sync::Arc;
use std::time::Instant;

use bes_core::errors::{ErrorInfo, SweepError};

use crate::config::SweepConfig;
use crate::dataset::Dataset;
use crate::dispatch::{dispatch, JobPipeline};
use crate::grid::expand;
use crate::record::ResultRecord;
use crate::report::{SweepSummary, SweepTally};
use crate::runner::SimulationEngine;

/// Artifacts of a completed sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    /// Valid records in arrival order, as written to the CSV.
    pub dataset: Dataset,
    /// Counts and provenance, as written next to the dataset.
    pub summary: SweepSummary,
}

fn io_error(code: &str, path: &std::path::Path, err: std::io::Error) -> SweepError {
    SweepError::Io(
        ErrorInfo::new(code, "failed to prepare sweep output")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

/// Runs every job of `config` on `engine` and writes the dataset and summary.
///
/// `on_record` sees each record as it completes together with its arrival
/// position and the job count. Fails only when the pool cannot start, the
/// output cannot be written or no job produced a valid record.
pub fn run_sweep<F>(
    config: Arc<SweepConfig>,
    engine: Arc<dyn SimulationEngine>,
    mut on_record: F,
) -> Result<SweepOutcome, SweepError>
where
    F: FnMut(usize, usize, &ResultRecord),
{
    let started_at = Instant::now();
    let jobs = expand(&config.sweep);
    tracing::info!(jobs = jobs.len(), plan_hash = %config.plan_hash, "generated grid");

    if config.output_dir.exists() {
        fs::remove_dir_all(&config.output_dir)
            .map_err(|err| io_error("sweep-clean", &config.output_dir, err))?;
    }
    fs::create_dir_all(&config.output_dir)
        .map_err(|err| io_error("sweep-output-dir", &config.output_dir, err))?;

    let pipeline = JobPipeline::new(Arc::clone(&config), engine);
    let completions = dispatch(jobs, config.workers, pipeline)?;
    let total = completions.total();
    let mut tally = SweepTally::default();
    let mut records = Vec::with_capacity(total);
    for (position, record) in completions.enumerate() {
        tally.observe(&record);
        on_record(position + 1, total, &record);
        records.push(record);
    }
    // Only empty once every scratch dir is gone.
    if let Err(err) = fs::remove_dir(&config.output_dir) {
        tracing::debug!(path = %config.output_dir.display(), error = %err, "output dir left in place");
    }

    let dataset = Dataset::assemble(records)?;
    dataset.write_csv(&config.dataset_path)?;
    let summary = SweepSummary::new(
        &config.plan_hash,
        tally,
        Some(config.dataset_path.clone()),
        started_at.elapsed(),
    );
    summary.write_to(&config.summary_path())?;
    tracing::info!(
        valid = summary.jobs_valid,
        total = summary.jobs_total,
        secs = summary.elapsed_secs,
        dataset = %config.dataset_path.display(),
        "sweep complete"
    );
    Ok(SweepOutcome { dataset, summary })
}
