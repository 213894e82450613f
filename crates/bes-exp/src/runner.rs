use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use bes_core::errors::{ErrorInfo, SweepError};

use crate::config::{EngineConfig, SweepConfig};
use crate::extract::locate_store;
use crate::grid::Job;
use crate::mount::{docker_mount_source, PathMapping};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Scratch directory owned by exactly one job.
///
/// Created before the job starts and removed when dropped, whatever the
/// outcome of the job.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates an empty scratch directory at `path`, clearing leftovers from earlier sweeps.
    pub fn create(path: PathBuf) -> Result<Self, SweepError> {
        if path.exists() {
            fs::remove_dir_all(&path).map_err(|err| scratch_error(&path, err))?;
        }
        fs::create_dir_all(&path).map_err(|err| scratch_error(&path, err))?;
        Ok(Self { path })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %err, "failed to remove scratch dir");
        }
    }
}

fn scratch_error(path: &Path, err: std::io::Error) -> SweepError {
    SweepError::Io(
        ErrorInfo::new("scratch-dir", "failed to prepare scratch directory")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

/// How an engine invocation ended. Neither variant says anything about validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// The process exited on its own.
    Exited {
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
    },
    /// The process was killed after exceeding its time limit.
    TimedOut {
        /// Configured limit.
        after: Duration,
    },
}

/// One engine invocation.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Job being simulated.
    pub job: &'a Job,
    /// Host path of the workflow descriptor.
    pub workflow: &'a Path,
    /// Job's scratch directory, used as the working directory.
    pub workdir: &'a Path,
}

/// External simulation engine.
pub trait SimulationEngine: Send + Sync {
    /// Runs one simulation to completion or timeout.
    ///
    /// Returns an error only when the engine could not be started at all.
    fn run(&self, invocation: &Invocation<'_>) -> Result<EngineStatus, SweepError>;
}

/// Engine launched as an OS process, optionally inside a container.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    engine: EngineConfig,
    mapping: PathMapping,
    project_root: PathBuf,
}

impl ProcessEngine {
    /// Builds the engine launcher described by `config`.
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            engine: config.engine.clone(),
            mapping: config.mapping.clone(),
            project_root: config.project_root.clone(),
        }
    }

    /// Command line for running `workflow` inside `workdir`.
    pub fn command(&self, workflow: &Path, workdir: &Path) -> Result<Command, SweepError> {
        let mut command = match &self.engine.container {
            None => {
                let mut command = Command::new(&self.engine.program);
                command.arg("run").arg("-w").arg(workflow);
                command
            }
            Some(container) => {
                let source = docker_mount_source(&self.project_root.display().to_string());
                let mut command = Command::new(&container.runtime);
                command
                    .arg("run")
                    .arg("--rm")
                    .arg("-v")
                    .arg(format!("{source}:{}", container.mount_point))
                    .arg("-w")
                    .arg(self.mapping.map(workdir)?)
                    .arg(&container.image)
                    .arg(&self.engine.program)
                    .arg("run")
                    .arg("-w")
                    .arg(self.mapping.map(workflow)?);
                command
            }
        };
        command
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Ok(command)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.engine.timeout_secs.max(1))
    }
}

impl SimulationEngine for ProcessEngine {
    fn run(&self, invocation: &Invocation<'_>) -> Result<EngineStatus, SweepError> {
        let mut command = self.command(invocation.workflow, invocation.workdir)?;
        let mut child = command.spawn().map_err(|err| {
            SweepError::Engine(
                ErrorInfo::new("engine-spawn", "failed to launch the engine")
                    .with_context("run_id", invocation.job.run_id.clone())
                    .with_context("program", format!("{:?}", command.get_program()))
                    .with_hint(err.to_string()),
            )
        })?;
        wait_with_timeout(&mut child, self.timeout(), &invocation.job.run_id)
    }
}

/// Waits for `child`, killing and reaping it once `timeout` has elapsed.
pub fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    run_id: &str,
) -> Result<EngineStatus, SweepError> {
    let started_at = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(EngineStatus::Exited {
                    code: status.code(),
                })
            }
            Ok(None) => {
                if started_at.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(EngineStatus::TimedOut { after: timeout });
                }
                thread::sleep(POLL_INTERVAL.min(timeout));
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SweepError::Engine(
                    ErrorInfo::new("engine-wait", "failed to wait for the engine")
                        .with_context("run_id", run_id)
                        .with_hint(err.to_string()),
                ));
            }
        }
    }
}

/// Result of running one job through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// How the invocation ended.
    pub status: EngineStatus,
    /// Result store, when the engine left a non-empty one behind.
    pub store: Option<PathBuf>,
}

/// Invokes `engine` once for `job` inside `scratch`.
///
/// A non-zero exit status is not an error; success is judged solely by
/// the presence of the result store.
pub fn run_job(
    engine: &dyn SimulationEngine,
    job: &Job,
    workflow: &Path,
    scratch: &ScratchDir,
) -> Result<RunOutcome, SweepError> {
    let invocation = Invocation {
        job,
        workflow,
        workdir: scratch.path(),
    };
    let status = engine.run(&invocation)?;
    if let EngineStatus::Exited { code } = &status {
        tracing::debug!(run_id = %job.run_id, code = ?code, "engine exited");
    }
    let store = match status {
        EngineStatus::TimedOut { .. } => None,
        EngineStatus::Exited { .. } => locate_store(scratch.path()),
    };
    Ok(RunOutcome { status, store })
}
