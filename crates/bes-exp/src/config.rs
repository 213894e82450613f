use std::fs;
use std::path::{Component, Path, PathBuf};

use bes_core::errors::{ErrorInfo, SweepError};
use bes_core::ParamValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::grid::SweepSpec;
use crate::hash::stable_hash_string;
use crate::mount::PathMapping;
use crate::serde::from_yaml_slice;
use crate::workflow::required_parameters;

/// Sweep dimension filled from the weather directory listing.
pub const WEATHER_KEY: &str = "weather";
/// Sweep dimension filled from the seed directory listing.
pub const SEED_KEY: &str = "seed";

const WEATHER_EXTENSION: &str = "epw";
const SEED_EXTENSION: &str = "osm";

fn config_error(code: &str, message: impl Into<String>) -> SweepError {
    SweepError::Config(ErrorInfo::new(code, message))
}

/// Container runtime used to isolate the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Runtime executable, e.g. `docker` or `podman`.
    #[serde(default = "ContainerConfig::default_runtime")]
    pub runtime: String,
    /// Image that ships the engine.
    #[serde(default = "ContainerConfig::default_image")]
    pub image: String,
    /// Where the project root is mounted inside the container.
    #[serde(default = "ContainerConfig::default_mount_point")]
    pub mount_point: String,
}

impl ContainerConfig {
    fn default_runtime() -> String {
        "docker".to_string()
    }

    fn default_image() -> String {
        "nrel/openstudio:latest".to_string()
    }

    fn default_mount_point() -> String {
        "/work".to_string()
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            runtime: Self::default_runtime(),
            image: Self::default_image(),
            mount_point: Self::default_mount_point(),
        }
    }
}

/// How the external engine is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable (inside the container when one is configured).
    #[serde(default = "EngineConfig::default_program")]
    pub program: String,
    /// Wall-clock limit for one engine invocation.
    #[serde(default = "EngineConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional container isolation.
    #[serde(default)]
    pub container: Option<ContainerConfig>,
}

impl EngineConfig {
    fn default_program() -> String {
        "openstudio".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        3600
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            timeout_secs: Self::default_timeout_secs(),
            container: None,
        }
    }
}

/// On-disk configuration as written by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Host project root; relative paths below resolve against it.
    #[serde(default = "ConfigFile::default_project_root")]
    pub project_root: PathBuf,
    /// Parent of the per-job scratch directories.
    #[serde(default = "ConfigFile::default_output_dir")]
    pub output_dir: PathBuf,
    /// Directory holding `*.epw` weather files.
    #[serde(default = "ConfigFile::default_weather_dir")]
    pub weather_dir: PathBuf,
    /// Directory holding `*.osm` seed models.
    #[serde(default = "ConfigFile::default_seeds_dir")]
    pub seeds_dir: PathBuf,
    /// Directory holding the engine measures.
    #[serde(default = "ConfigFile::default_measures_dir")]
    pub measures_dir: PathBuf,
    /// Destination of the aggregated CSV dataset.
    #[serde(default = "ConfigFile::default_dataset_path")]
    pub dataset_path: PathBuf,
    /// Worker pool size.
    #[serde(default = "ConfigFile::default_workers")]
    pub workers: usize,
    /// Engine invocation settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Physical sweep dimensions in SI units, in enumeration order.
    pub grid: IndexMap<String, Vec<ParamValue>>,
}

impl ConfigFile {
    fn default_project_root() -> PathBuf {
        PathBuf::from(".")
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from("dataset_runs_sweep")
    }

    fn default_weather_dir() -> PathBuf {
        PathBuf::from("weather")
    }

    fn default_seeds_dir() -> PathBuf {
        PathBuf::from("seeds")
    }

    fn default_measures_dir() -> PathBuf {
        PathBuf::from("measures")
    }

    fn default_dataset_path() -> PathBuf {
        PathBuf::from("sweep_results.csv")
    }

    const fn default_workers() -> usize {
        15
    }
}

/// Validated, immutable configuration shared by every sweep component.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    /// Canonical host project root.
    pub project_root: PathBuf,
    /// Parent of the per-job scratch directories.
    pub output_dir: PathBuf,
    /// Weather input directory.
    pub weather_dir: PathBuf,
    /// Seed model directory.
    pub seeds_dir: PathBuf,
    /// Measures directory referenced by every workflow.
    pub measures_dir: PathBuf,
    /// Destination of the aggregated dataset.
    pub dataset_path: PathBuf,
    /// Worker pool size, at least one.
    pub workers: usize,
    /// Engine invocation settings.
    pub engine: EngineConfig,
    /// Host to engine path translation.
    pub mapping: PathMapping,
    /// Full sweep: configured grid followed by the weather and seed dimensions.
    pub sweep: SweepSpec,
    /// Hash of the inputs that determine the job list.
    pub plan_hash: String,
}

impl SweepConfig {
    /// Validates a parsed configuration file, resolving relative paths against `base_dir`.
    pub fn resolve(file: ConfigFile, base_dir: &Path) -> Result<Self, SweepError> {
        let root = base_dir.join(&file.project_root);
        let project_root = root.canonicalize().map_err(|err| {
            SweepError::Config(
                ErrorInfo::new("config-project-root", "project root does not exist")
                    .with_context("path", root.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let output_dir = normalize(&project_root.join(&file.output_dir));
        let weather_dir = existing_dir(&project_root, &file.weather_dir, "weather")?;
        let seeds_dir = existing_dir(&project_root, &file.seeds_dir, "seeds")?;
        let measures_dir = existing_dir(&project_root, &file.measures_dir, "measures")?;
        let dataset_path = project_root.join(&file.dataset_path);
        validate_output_dir(
            &output_dir,
            &project_root,
            &[
                weather_dir.as_path(),
                seeds_dir.as_path(),
                measures_dir.as_path(),
                dataset_path.as_path(),
            ],
        )?;

        if file.workers == 0 {
            return Err(config_error("config-workers", "worker count must be at least 1"));
        }
        if file.engine.timeout_secs == 0 {
            return Err(config_error(
                "config-timeout",
                "engine timeout must be at least one second",
            ));
        }
        validate_grid(&file.grid)?;

        let weather_files = list_inputs(&weather_dir, WEATHER_EXTENSION)?;
        let seed_files = list_inputs(&seeds_dir, SEED_EXTENSION)?;
        if weather_files.is_empty() || seed_files.is_empty() {
            return Err(SweepError::Config(
                ErrorInfo::new("config-missing-inputs", "missing weather or seed files")
                    .with_context("weather_files", weather_files.len().to_string())
                    .with_context("seed_files", seed_files.len().to_string())
                    .with_hint("add *.epw files to the weather dir and *.osm files to the seeds dir"),
            ));
        }

        let mapping = match &file.engine.container {
            Some(container) => PathMapping::Container {
                host_root: project_root.clone(),
                container_root: container.mount_point.clone(),
            },
            None => PathMapping::Native,
        };
        for dir in [&output_dir, &weather_dir, &seeds_dir, &measures_dir] {
            mapping.map(dir)?;
        }

        let mut sweep = SweepSpec::new();
        for (name, values) in &file.grid {
            sweep = sweep.with_dimension(name.clone(), values.iter().cloned());
        }
        let sweep = sweep
            .with_dimension(WEATHER_KEY, weather_files.into_iter().map(ParamValue::Text))
            .with_dimension(SEED_KEY, seed_files.into_iter().map(ParamValue::Text));
        let plan_hash = stable_hash_string(&(&sweep, &file.engine))?;

        Ok(Self {
            project_root,
            output_dir,
            weather_dir,
            seeds_dir,
            measures_dir,
            dataset_path,
            workers: file.workers,
            engine: file.engine,
            mapping,
            sweep,
            plan_hash,
        })
    }

    /// Returns a copy with a different worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, SweepError> {
        if workers == 0 {
            return Err(config_error("config-workers", "worker count must be at least 1"));
        }
        self.workers = workers;
        Ok(self)
    }

    /// Returns a copy with a different engine timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Result<Self, SweepError> {
        if timeout_secs == 0 {
            return Err(config_error(
                "config-timeout",
                "engine timeout must be at least one second",
            ));
        }
        self.engine.timeout_secs = timeout_secs;
        Ok(self)
    }

    /// Path of the JSON summary written next to the dataset.
    pub fn summary_path(&self) -> PathBuf {
        self.dataset_path.with_extension("summary.json")
    }

    /// Scratch directory owned by the job `run_id`.
    pub fn scratch_dir(&self, run_id: &str) -> PathBuf {
        self.output_dir.join(run_id)
    }
}

/// Loads and validates a YAML configuration. Relative paths resolve against the file's directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SweepConfig, SweepError> {
    let config_path = path.as_ref();
    let bytes = fs::read(config_path).map_err(|err| {
        SweepError::Config(
            ErrorInfo::new("config-read", "failed to read configuration")
                .with_context("path", config_path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let file: ConfigFile = from_yaml_slice(&bytes).map_err(|err| {
        SweepError::Config(
            ErrorInfo::new("config-parse", "configuration is not valid YAML")
                .with_context("path", config_path.display().to_string())
                .with_hint(err.info().message.clone()),
        )
    })?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let base_dir = if base_dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base_dir
    };
    SweepConfig::resolve(file, base_dir)
}

fn existing_dir(root: &Path, dir: &Path, label: &str) -> Result<PathBuf, SweepError> {
    let path = root.join(dir);
    if !path.is_dir() {
        return Err(SweepError::Config(
            ErrorInfo::new("config-missing-dir", format!("{label} directory does not exist"))
                .with_context("path", path.display().to_string()),
        ));
    }
    Ok(path)
}

/// Folds `.` and `..` without touching the filesystem; `path` need not exist.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// The output dir is wiped before every sweep, so it must not hold any input.
fn validate_output_dir(
    output_dir: &Path,
    project_root: &Path,
    guarded: &[&Path],
) -> Result<(), SweepError> {
    let clash = if output_dir == project_root {
        Some(project_root)
    } else {
        guarded
            .iter()
            .copied()
            .find(|path| normalize(path).starts_with(output_dir))
    };
    match clash {
        Some(path) => Err(SweepError::Config(
            ErrorInfo::new(
                "config-output-dir",
                "output dir would remove project inputs when cleared",
            )
            .with_context("output_dir", output_dir.display().to_string())
            .with_context("conflicts_with", path.display().to_string())
            .with_hint("point output_dir at a dedicated directory such as dataset_runs_sweep"),
        )),
        None => Ok(()),
    }
}

fn validate_grid(grid: &IndexMap<String, Vec<ParamValue>>) -> Result<(), SweepError> {
    for reserved in [WEATHER_KEY, SEED_KEY] {
        if grid.contains_key(reserved) {
            return Err(SweepError::Config(
                ErrorInfo::new("config-reserved-key", "grid declares a reserved dimension")
                    .with_context("key", reserved)
                    .with_hint("weather and seed values come from their directories"),
            ));
        }
    }
    if let Some((name, _)) = grid.iter().find(|(_, values)| values.is_empty()) {
        return Err(SweepError::Config(
            ErrorInfo::new("config-empty-dimension", "grid dimension has no values")
                .with_context("key", name.as_str()),
        ));
    }
    let missing: Vec<&str> = required_parameters()
        .filter(|name| !grid.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(SweepError::Config(
            ErrorInfo::new("config-missing-parameter", "grid is missing workflow parameters")
                .with_context("missing", missing.join(",")),
        ));
    }
    Ok(())
}

fn list_inputs(dir: &Path, extension: &str) -> Result<Vec<String>, SweepError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        SweepError::Config(
            ErrorInfo::new("config-list-dir", "failed to list input directory")
                .with_context("path", dir.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let mut names = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
