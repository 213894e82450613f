use std::collections::BTreeMap;
use std::fmt::{self, Display};

use bes_core::ParamValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{SEED_KEY, WEATHER_KEY};
use crate::grid::Job;
use crate::workflow::report_column;

/// Headline total intensity column.
pub const EUI_TOTAL: &str = "eui_total_MJ_m2";
/// Total floor area column.
pub const TOTAL_AREA: &str = "total_area_m2";
/// Conditioned volume column.
pub const TOTAL_VOLUME: &str = "total_volume_m3";
/// Flag column set when the total was summed from end uses.
pub const EUI_TOTAL_FROM_END_USES: &str = "eui_total_from_end_uses";

/// End-use categories reported by the engine, in report order.
pub const END_USES: [&str; 14] = [
    "Heating",
    "Cooling",
    "Interior Lighting",
    "Exterior Lighting",
    "Interior Equipment",
    "Exterior Equipment",
    "Fans",
    "Pumps",
    "Heat Rejection",
    "Humidification",
    "Heat Recovery",
    "Water Systems",
    "Refrigeration",
    "Generators",
];

/// Intensity column for an end-use category, e.g. `eui_interior_lighting_MJ_m2`.
pub fn end_use_column(category: &str) -> String {
    format!("eui_{}_MJ_m2", category.to_lowercase().replace(' ', "_"))
}

/// Every metric column at its default value.
pub fn default_metrics() -> BTreeMap<String, f64> {
    let mut metrics: BTreeMap<String, f64> = END_USES
        .iter()
        .map(|category| (end_use_column(category), 0.0))
        .collect();
    metrics.insert(EUI_TOTAL.to_string(), 0.0);
    metrics.insert(TOTAL_AREA.to_string(), 0.0);
    metrics.insert(TOTAL_VOLUME.to_string(), 0.0);
    metrics
}

/// Stage at which a job's pipeline gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The workflow descriptor could not be built or written.
    Workflow,
    /// The scratch directory could not be created.
    Scratch,
    /// The engine process could not be launched.
    Spawn,
    /// The engine exceeded its time limit.
    Timeout,
    /// The engine finished without producing a result store.
    MissingStore,
    /// The result store reports no floor area.
    NonPositiveArea,
    /// The result store could not be queried.
    StoreRead,
    /// The job panicked.
    Panic,
}

impl FailureKind {
    /// Stable label used in logs and summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Workflow => "workflow",
            FailureKind::Scratch => "scratch",
            FailureKind::Spawn => "spawn",
            FailureKind::Timeout => "timeout",
            FailureKind::MissingStore => "missing-store",
            FailureKind::NonPositiveArea => "non-positive-area",
            FailureKind::StoreRead => "store-read",
            FailureKind::Panic => "panic",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dataset cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
}

impl Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Bool(flag) => write!(f, "{flag}"),
            Cell::Number(number) => write!(f, "{number}"),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

impl From<&ParamValue> for Cell {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Number(number) => Cell::Number(*number),
            ParamValue::Text(text) => Cell::Text(text.clone()),
        }
    }
}

/// Outcome of one job, produced exactly once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Job identifier.
    pub run_id: String,
    /// Seed model file name.
    pub seed_file: String,
    /// Weather file name.
    pub weather_file: String,
    /// Original SI parameter values keyed by dataset column.
    pub inputs: IndexMap<String, ParamValue>,
    /// Metric values keyed by dataset column.
    pub metrics: BTreeMap<String, f64>,
    /// Whether extraction confirmed a usable run.
    pub valid: bool,
    /// Whether the headline total was summed from end uses.
    pub total_from_end_uses: bool,
    /// Why the record is invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ResultRecord {
    /// Invalid record for `job` with every metric at its default.
    pub fn for_job(job: &Job) -> Self {
        let inputs = job
            .params
            .iter()
            .filter(|(name, _)| name.as_str() != WEATHER_KEY && name.as_str() != SEED_KEY)
            .map(|(name, value)| (report_column(name), value.clone()))
            .collect();
        Self {
            run_id: job.run_id.clone(),
            seed_file: job.label(SEED_KEY),
            weather_file: job.label(WEATHER_KEY),
            inputs,
            metrics: default_metrics(),
            valid: false,
            total_from_end_uses: false,
            failure: None,
        }
    }

    /// Invalid record for `job` tagged with the failing stage.
    pub fn failed(job: &Job, kind: FailureKind) -> Self {
        Self::for_job(job).with_failure(kind)
    }

    /// Marks the record invalid and resets its metrics.
    pub fn with_failure(mut self, kind: FailureKind) -> Self {
        self.metrics = default_metrics();
        self.valid = false;
        self.total_from_end_uses = false;
        self.failure = Some(kind);
        self
    }

    /// Metric value, zero when absent.
    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or_default()
    }

    /// Flat column to cell mapping used by the dataset writer.
    pub fn cells(&self) -> BTreeMap<String, Cell> {
        let mut cells = BTreeMap::new();
        cells.insert("run_id".to_string(), Cell::Text(self.run_id.clone()));
        cells.insert("seed_file".to_string(), Cell::Text(self.seed_file.clone()));
        cells.insert(
            "weather_file".to_string(),
            Cell::Text(self.weather_file.clone()),
        );
        cells.insert("valid_sim".to_string(), Cell::Bool(self.valid));
        for (column, value) in &self.inputs {
            cells.insert(column.clone(), Cell::from(value));
        }
        for (column, value) in &self.metrics {
            cells.insert(column.clone(), Cell::Number(*value));
        }
        cells.insert(
            EUI_TOTAL_FROM_END_USES.to_string(),
            Cell::Bool(self.total_from_end_uses),
        );
        cells
    }
}
