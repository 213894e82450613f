//! Parametric sweep orchestration for building energy simulations.
//!
//! A YAML configuration is expanded into a cartesian grid of jobs. Each job
//! runs the external engine in its own scratch directory, its result store is
//! reduced to a flat record, and the valid records are aggregated into a CSV
//! dataset.

mod config;
mod dataset;
mod dispatch;
mod extract;
mod grid;
mod hash;
mod measures;
mod mount;
mod record;
mod report;
mod runner;
mod serde;
mod sweep;
mod workflow;

pub use config::{
    load_config, ConfigFile, ContainerConfig, EngineConfig, SweepConfig, SEED_KEY, WEATHER_KEY,
};
pub use dataset::{column_order, Dataset, PRIORITY_COLUMNS};
pub use dispatch::{dispatch, Completions, JobPipeline};
pub use extract::{
    extract_record, locate_store, read_metrics, Extraction, MetricKey, ResultStore, StoreMetrics,
    BUILDING_AREA, CONDITIONED_VOLUME, END_USES_TABLE, ENERGY_SCALE, RESULT_STORE, TOTAL_SITE_EUI,
};
pub use grid::{expand, run_id, run_id_width, Job, SweepSpec, DEFAULT_RUN_ID_WIDTH};
pub use hash::stable_hash_string;
pub use measures::{inspect_measures, DoctorReport, Finding, Severity};
pub use mount::{docker_mount_source, to_container_path, PathMapping};
pub use record::{
    default_metrics, end_use_column, Cell, FailureKind, ResultRecord, END_USES, EUI_TOTAL,
    EUI_TOTAL_FROM_END_USES, TOTAL_AREA, TOTAL_VOLUME,
};
pub use report::{progress_line, SweepSummary, SweepTally};
pub use runner::{
    run_job, wait_with_timeout, EngineStatus, Invocation, ProcessEngine, RunOutcome, ScratchDir,
    SimulationEngine,
};
pub use sweep::{run_sweep, SweepOutcome};
pub use workflow::{
    build_workflow, report_column, required_measures, required_parameters, ArgumentBinding,
    FixedArgument, StepTemplate, WorkflowDescriptor, WorkflowStep, STEPS, WORKFLOW_FILE,
};

pub use crate::serde::{from_json_slice, from_yaml_slice, to_canonical_json_bytes, to_pretty_json_bytes};
