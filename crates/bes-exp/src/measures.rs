use std::fmt::{self, Display};
use std::fs;
use std::path::Path;

use bes_core::errors::{ErrorInfo, SweepError};
use serde::{Deserialize, Serialize};

use crate::workflow::required_measures;

const MEASURE_SCRIPT: &str = "measure.rb";
const MEASURE_MANIFEST: &str = "measure.xml";

/// How serious a doctor finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// The sweep may still work.
    Warning,
    /// Every job using this measure will fail.
    Error,
}

/// One problem found in the measures directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Whether the sweep can still proceed.
    pub severity: Severity,
    /// Measure directory name the finding is about.
    pub measure: String,
    /// Stable identifier such as `missing-script`.
    pub code: String,
    /// Human-readable explanation with a suggested fix.
    pub message: String,
}

impl Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        write!(f, "[{label}] {}: {}", self.measure, self.message)
    }
}

/// Outcome of inspecting a measures directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorReport {
    /// Measures with a script at the expected depth, sorted.
    pub measures: Vec<String>,
    pub findings: Vec<Finding>,
}

impl DoctorReport {
    /// Findings with [`Severity::Error`].
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity == Severity::Error)
    }

    /// True when no finding is an error.
    pub fn is_healthy(&self) -> bool {
        self.errors().next().is_none()
    }

    fn push(&mut self, severity: Severity, measure: &str, code: &str, message: String) {
        self.findings.push(Finding {
            severity,
            measure: measure.to_string(),
            code: code.to_string(),
            message,
        });
    }
}

/// Checks every measure directory under `dir` and the measures the workflow needs.
pub fn inspect_measures(dir: &Path) -> Result<DoctorReport, SweepError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        SweepError::Config(
            ErrorInfo::new("doctor-measures-dir", "measures directory is not readable")
                .with_context("path", dir.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();

    let mut report = DoctorReport::default();
    for name in &names {
        let measure_dir = dir.join(name);
        if measure_dir.join(name).is_dir() {
            report.push(
                Severity::Warning,
                name,
                "double-nesting",
                format!("found {name}/{name}/; move its files up one level"),
            );
        }
        if measure_dir.join(MEASURE_SCRIPT).is_file() {
            report.measures.push(name.clone());
        } else {
            report.push(
                Severity::Error,
                name,
                "missing-script",
                format!("no {MEASURE_SCRIPT} in {name}/"),
            );
        }
        if !measure_dir.join(MEASURE_MANIFEST).is_file() {
            report.push(
                Severity::Warning,
                name,
                "missing-manifest",
                format!("no {MEASURE_MANIFEST} in {name}/; the engine may regenerate it"),
            );
        }
    }

    for required in required_measures() {
        if !names.iter().any(|name| name == required) {
            report.push(
                Severity::Error,
                required,
                "missing-required",
                "the workflow applies this measure but its directory is absent".to_string(),
            );
        }
    }
    Ok(report)
}
