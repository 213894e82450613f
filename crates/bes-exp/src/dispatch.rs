use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use bes_core::errors::{ErrorInfo, SweepError};

use crate::config::SweepConfig;
use crate::extract::extract_record;
use crate::grid::Job;
use crate::record::{FailureKind, ResultRecord};
use crate::runner::{run_job, EngineStatus, ScratchDir, SimulationEngine};
use crate::workflow::build_workflow;

/// Per-job chain: scratch dir, workflow, engine, extraction.
#[derive(Clone)]
pub struct JobPipeline {
    config: Arc<SweepConfig>,
    engine: Arc<dyn SimulationEngine>,
}

impl JobPipeline {
    /// Creates a pipeline sharing `config` and `engine` across workers.
    pub fn new(config: Arc<SweepConfig>, engine: Arc<dyn SimulationEngine>) -> Self {
        Self { config, engine }
    }

    /// Shared configuration.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Runs the full chain for `job`, always yielding a record.
    pub fn execute(&self, job: &Job) -> ResultRecord {
        let record = ResultRecord::for_job(job);
        let scratch = match ScratchDir::create(self.config.scratch_dir(&job.run_id)) {
            Ok(scratch) => scratch,
            Err(err) => return degrade(record, FailureKind::Scratch, &err),
        };
        let workflow = match build_workflow(job, &self.config)
            .and_then(|descriptor| descriptor.write_to(scratch.path()))
        {
            Ok(path) => path,
            Err(err) => return degrade(record, FailureKind::Workflow, &err),
        };
        let outcome = match run_job(self.engine.as_ref(), job, &workflow, &scratch) {
            Ok(outcome) => outcome,
            Err(err) => return degrade(record, FailureKind::Spawn, &err),
        };
        match outcome.status {
            EngineStatus::TimedOut { after } => {
                tracing::warn!(run_id = %job.run_id, secs = after.as_secs(), "engine timed out");
                record.with_failure(FailureKind::Timeout)
            }
            EngineStatus::Exited { .. } => extract_record(outcome.store.as_deref(), record),
        }
    }

    /// Like [`JobPipeline::execute`], but a panic becomes an invalid record.
    pub fn execute_isolated(&self, job: &Job) -> ResultRecord {
        match panic::catch_unwind(AssertUnwindSafe(|| self.execute(job))) {
            Ok(record) => record,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|text| (*text).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(run_id = %job.run_id, reason = %reason, "job panicked");
                ResultRecord::failed(job, FailureKind::Panic)
            }
        }
    }
}

fn degrade(record: ResultRecord, kind: FailureKind, err: &SweepError) -> ResultRecord {
    tracing::warn!(run_id = %record.run_id, kind = %kind, error = %err, "job failed");
    record.with_failure(kind)
}

/// Unordered stream of records, one per dispatched job.
///
/// Ends once every job has reported.
pub struct Completions {
    receiver: Receiver<ResultRecord>,
    total: usize,
    received: usize,
    _pool: rayon::ThreadPool,
}

impl Completions {
    /// Number of dispatched jobs.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of records yielded so far.
    pub fn received(&self) -> usize {
        self.received
    }
}

impl Iterator for Completions {
    type Item = ResultRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.received == self.total {
            return None;
        }
        let record = self.receiver.recv().ok()?;
        self.received += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.received;
        (0, Some(remaining))
    }
}

/// Fans `jobs` out over a pool of `workers` threads.
///
/// At most `workers` jobs run at once. Records arrive in completion order.
pub fn dispatch(
    jobs: Vec<Job>,
    workers: usize,
    pipeline: JobPipeline,
) -> Result<Completions, SweepError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|index| format!("bes-worker-{index}"))
        .build()
        .map_err(|err| {
            SweepError::Io(
                ErrorInfo::new("thread-pool", "failed to start worker pool")
                    .with_context("workers", workers.to_string())
                    .with_hint(err.to_string()),
            )
        })?;

    let total = jobs.len();
    let (sender, receiver) = mpsc::channel();
    for job in jobs {
        let sender = sender.clone();
        let pipeline = pipeline.clone();
        pool.spawn(move || {
            let record = pipeline.execute_isolated(&job);
            let _ = sender.send(record);
        });
    }
    drop(sender);

    tracing::debug!(jobs = total, workers = workers.max(1), "dispatched sweep");
    Ok(Completions {
        receiver,
        total,
        received: 0,
        _pool: pool,
    })
}
