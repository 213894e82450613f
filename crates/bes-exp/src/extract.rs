use std::fs;
use std::path::{Path, PathBuf};

use bes_core::errors::{ErrorInfo, SweepError};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::record::{
    end_use_column, FailureKind, ResultRecord, END_USES, EUI_TOTAL, TOTAL_AREA, TOTAL_VOLUME,
};

/// Location of the result store relative to a job's scratch directory.
pub const RESULT_STORE: &str = "run/eplusout.sql";

/// Scale from the store's native energy unit (GJ) to the reported one (MJ).
pub const ENERGY_SCALE: f64 = 1000.0;

/// Table holding the per-category end-use rows.
pub const END_USES_TABLE: &str = "End Uses";

/// Fixed (table, row, column) address of a tabular report value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricKey {
    /// Report table name.
    pub table: &'static str,
    /// Row name within the table.
    pub row: &'static str,
    /// Column name within the table.
    pub column: &'static str,
}

/// Total building floor area in m².
pub const BUILDING_AREA: MetricKey = MetricKey {
    table: "Building Area",
    row: "Total Building Area",
    column: "Area",
};

/// Net conditioned volume in m³.
pub const CONDITIONED_VOLUME: MetricKey = MetricKey {
    table: "Building Area",
    row: "Net Conditioned Building Volume",
    column: "Volume",
};

/// Authoritative site energy intensity in MJ/m².
pub const TOTAL_SITE_EUI: MetricKey = MetricKey {
    table: "Site and Source Energy",
    row: "Total Site Energy",
    column: "Energy Per Total Building Area",
};

fn store_error(code: &str, message: &str, path: &Path, err: impl ToString) -> SweepError {
    SweepError::Store(
        ErrorInfo::new(code, message)
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

/// Read-only handle on one run's result database.
pub struct ResultStore {
    conn: Connection,
    path: PathBuf,
}

impl ResultStore {
    /// Opens an existing store without creating or modifying it.
    pub fn open(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| store_error("store-open", "failed to open result store", path, err))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Looks up a single tabular value.
    pub fn lookup(&self, key: MetricKey) -> Result<Option<f64>, SweepError> {
        let value: Option<SqlValue> = self
            .conn
            .query_row(
                "SELECT Value FROM TabularDataWithStrings \
                 WHERE TableName = ?1 AND RowName = ?2 AND ColumnName = ?3 LIMIT 1",
                params![key.table, key.row, key.column],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| store_error("store-query", "failed to query result store", &self.path, err))?;
        match value {
            None => Ok(None),
            Some(raw) => numeric(&raw).map_err(|text| {
                SweepError::Store(
                    ErrorInfo::new("store-value", "tabular value is not numeric")
                        .with_context("path", self.path.display().to_string())
                        .with_context("table", key.table)
                        .with_context("row", key.row)
                        .with_context("value", text),
                )
            }),
        }
    }

    /// Sums every numeric value of the rows named `row` in `table`.
    ///
    /// Empty and non-numeric cells are skipped.
    pub fn sum_rows(&self, table: &str, row: &str) -> Result<f64, SweepError> {
        let mut stmt = self
            .conn
            .prepare("SELECT Value FROM TabularDataWithStrings WHERE TableName = ?1 AND RowName = ?2")
            .map_err(|err| store_error("store-prepare", "failed to prepare query", &self.path, err))?;
        let rows = stmt
            .query_map(params![table, row], |row| row.get::<_, SqlValue>(0))
            .map_err(|err| store_error("store-query", "failed to query result store", &self.path, err))?;
        let mut total = 0.0;
        for value in rows {
            let value =
                value.map_err(|err| store_error("store-row", "failed to read row", &self.path, err))?;
            if let Ok(Some(number)) = numeric(&value) {
                total += number;
            }
        }
        Ok(total)
    }
}

fn numeric(value: &SqlValue) -> Result<Option<f64>, String> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Integer(number) => Ok(Some(*number as f64)),
        SqlValue::Real(number) => Ok(Some(*number)),
        SqlValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map(Some).map_err(|_| text.clone())
        }
        SqlValue::Blob(_) => Err("<blob>".to_string()),
    }
}

/// Metrics read from a store whose floor area is positive.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMetrics {
    /// Total floor area in m².
    pub area: f64,
    /// Conditioned volume in m³.
    pub volume: f64,
    /// Intensity per end-use category in MJ/m², in [`END_USES`] order.
    pub end_uses: Vec<(&'static str, f64)>,
    /// Reported total intensity in MJ/m².
    pub total: f64,
    /// Whether `total` is the end-use sum rather than the authoritative value.
    pub total_from_end_uses: bool,
}

/// Outcome of reading a store that could be queried.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Every metric was read.
    Complete(StoreMetrics),
    /// The store reports no usable floor area.
    NonPositiveArea {
        /// Area found, zero when missing.
        area: f64,
    },
}

/// Reads the fixed metric set from `store`.
pub fn read_metrics(store: &ResultStore) -> Result<Extraction, SweepError> {
    let area = store.lookup(BUILDING_AREA)?.unwrap_or(0.0);
    let volume = store.lookup(CONDITIONED_VOLUME)?.unwrap_or(0.0);
    if area <= 0.0 || !area.is_finite() {
        return Ok(Extraction::NonPositiveArea { area });
    }

    let mut end_uses = Vec::with_capacity(END_USES.len());
    let mut running_total = 0.0;
    for category in END_USES {
        let native = store.sum_rows(END_USES_TABLE, category)?;
        let intensity = native * ENERGY_SCALE / area;
        running_total += intensity;
        end_uses.push((category, intensity));
    }

    let (total, total_from_end_uses) = match store.lookup(TOTAL_SITE_EUI)? {
        Some(total) => (total, false),
        None => (running_total, true),
    };
    Ok(Extraction::Complete(StoreMetrics {
        area,
        volume,
        end_uses,
        total,
        total_from_end_uses,
    }))
}

/// Returns the store path inside `scratch` when the engine produced a non-empty one.
pub fn locate_store(scratch: &Path) -> Option<PathBuf> {
    let path = scratch.join(RESULT_STORE);
    match fs::metadata(&path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
        _ => None,
    }
}

/// Fills `record` from the store at `store_path`.
///
/// Never fails: a missing, empty or unreadable store yields an invalid
/// record with default metrics.
pub fn extract_record(store_path: Option<&Path>, record: ResultRecord) -> ResultRecord {
    let Some(path) = store_path.filter(|path| path.is_file()) else {
        return record.with_failure(FailureKind::MissingStore);
    };
    let extraction = ResultStore::open(path).and_then(|store| read_metrics(&store));
    match extraction {
        Ok(Extraction::Complete(metrics)) => apply_metrics(record, metrics),
        Ok(Extraction::NonPositiveArea { area }) => {
            tracing::debug!(run_id = %record.run_id, area, "result store reports no floor area");
            record.with_failure(FailureKind::NonPositiveArea)
        }
        Err(err) => {
            tracing::debug!(run_id = %record.run_id, error = %err, "result store unreadable");
            record.with_failure(FailureKind::StoreRead)
        }
    }
}

fn apply_metrics(mut record: ResultRecord, metrics: StoreMetrics) -> ResultRecord {
    if metrics.total_from_end_uses {
        tracing::warn!(
            run_id = %record.run_id,
            total = metrics.total,
            "total site energy missing; reporting the end-use sum, which may not share its unit basis"
        );
    }
    record.metrics.insert(TOTAL_AREA.to_string(), metrics.area);
    record.metrics.insert(TOTAL_VOLUME.to_string(), metrics.volume);
    for (category, intensity) in metrics.end_uses {
        record.metrics.insert(end_use_column(category), intensity);
    }
    record.metrics.insert(EUI_TOTAL.to_string(), metrics.total);
    record.total_from_end_uses = metrics.total_from_end_uses;
    record.valid = true;
    record.failure = None;
    record
}
