use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bes_core::errors::{ErrorInfo, SweepError};
use bes_core::provenance::RunProvenance;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::record::{ResultRecord, EUI_TOTAL};
use crate::serde::to_canonical_json_bytes;

const WEATHER_LABEL_CHARS: usize = 8;

/// One progress line: `[i/N] run_id | weather.. | status`.
pub fn progress_line(position: usize, total: usize, record: &ResultRecord) -> String {
    let weather: String = record.weather_file.chars().take(WEATHER_LABEL_CHARS).collect();
    let status = if record.valid {
        format!("{:.3} MJ/m2", record.metric(EUI_TOTAL))
    } else {
        match record.failure {
            Some(kind) => format!("FAIL ({kind})"),
            None => "FAIL".to_string(),
        }
    };
    format!("[{position}/{total}] {} | {weather}.. | {status}", record.run_id)
}

/// Running counts over the records of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepTally {
    /// Records seen.
    pub total: usize,
    /// Valid records seen.
    pub valid: usize,
    /// Invalid records per failure kind.
    pub failures: BTreeMap<String, usize>,
}

impl SweepTally {
    /// Counts `record`.
    pub fn observe(&mut self, record: &ResultRecord) {
        self.total += 1;
        if record.valid {
            self.valid += 1;
        } else {
            let kind = record
                .failure
                .map(|kind| kind.as_str())
                .unwrap_or("unknown");
            *self.failures.entry(kind.to_string()).or_default() += 1;
        }
    }
}

/// Reproducibility summary written next to the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Provenance of the sweep.
    pub provenance: RunProvenance,
    /// Jobs in the expanded grid.
    pub jobs_total: usize,
    /// Jobs that produced a valid record.
    pub jobs_valid: usize,
    /// Invalid jobs per failure kind.
    pub failures: BTreeMap<String, usize>,
    /// Dataset location, absent when nothing was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,
    /// Wall-clock duration of the sweep.
    pub elapsed_secs: f64,
}

impl SweepSummary {
    /// Builds the summary for a finished sweep.
    pub fn new(
        plan_hash: &str,
        tally: SweepTally,
        dataset_path: Option<PathBuf>,
        elapsed: Duration,
    ) -> Self {
        Self {
            provenance: provenance(plan_hash),
            jobs_total: tally.total,
            jobs_valid: tally.valid,
            failures: tally.failures,
            dataset_path,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    /// Writes the summary as canonical JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), SweepError> {
        let bytes = to_canonical_json_bytes(self)?;
        fs::write(path, bytes).map_err(|err| {
            SweepError::Io(
                ErrorInfo::new("summary-write", "failed to write sweep summary")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })
    }
}

fn provenance(plan_hash: &str) -> RunProvenance {
    let mut versions = BTreeMap::new();
    versions.insert("bes-exp".to_string(), env!("CARGO_PKG_VERSION").to_string());
    RunProvenance {
        plan_hash: plan_hash.to_string(),
        created_at: Utc::now().to_rfc3339(),
        tool_versions: versions,
        ..RunProvenance::default()
    }
}
