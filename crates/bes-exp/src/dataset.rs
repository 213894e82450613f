use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use bes_core::errors::{ErrorInfo, SweepError};
use csv::WriterBuilder;

use crate::record::{Cell, ResultRecord, EUI_TOTAL, TOTAL_AREA, TOTAL_VOLUME};

/// Columns that lead every dataset, in this order.
pub const PRIORITY_COLUMNS: [&str; 7] = [
    "run_id",
    "seed_file",
    "weather_file",
    "valid_sim",
    EUI_TOTAL,
    TOTAL_AREA,
    TOTAL_VOLUME,
];

fn wrap_csv(code: &str, path: &Path, err: impl ToString) -> SweepError {
    SweepError::Dataset(
        ErrorInfo::new(code, "failed to write dataset")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

/// Column order for the given column names: priority columns first, the rest sorted.
pub fn column_order<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let rest: BTreeSet<&str> = names
        .into_iter()
        .filter(|name| !PRIORITY_COLUMNS.contains(name))
        .collect();
    PRIORITY_COLUMNS
        .iter()
        .copied()
        .chain(rest)
        .map(str::to_string)
        .collect()
}

/// Valid records laid out as a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<BTreeMap<String, Cell>>,
}

impl Dataset {
    /// Keeps the valid records, in the order given.
    ///
    /// Fails when none of them is valid.
    pub fn assemble<I>(records: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = ResultRecord>,
    {
        let mut seen = 0usize;
        let rows: Vec<BTreeMap<String, Cell>> = records
            .into_iter()
            .inspect(|_| seen += 1)
            .filter(|record| record.valid)
            .map(|record| record.cells())
            .collect();
        if rows.is_empty() {
            return Err(SweepError::Dataset(
                ErrorInfo::new("dataset-no-valid-runs", "no valid runs to aggregate")
                    .with_context("records", seen.to_string())
                    .with_hint("check the engine installation with the doctor command"),
            ));
        }
        let columns = column_order(rows.iter().flat_map(|row| row.keys().map(String::as_str)));
        Ok(Self { columns, rows })
    }

    /// Ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows. Never true for an assembled dataset.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` in `column`.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    /// Writes the dataset as CSV with a header row.
    pub fn write_csv(&self, path: &Path) -> Result<(), SweepError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| wrap_csv("dataset-dir", path, err))?;
        }
        let file = File::create(path).map_err(|err| wrap_csv("dataset-open", path, err))?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        writer
            .write_record(&self.columns)
            .map_err(|err| wrap_csv("dataset-write-header", path, err))?;
        for row in &self.rows {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|column| row.get(column).map(ToString::to_string).unwrap_or_default())
                .collect();
            writer
                .write_record(&record)
                .map_err(|err| wrap_csv("dataset-write-row", path, err))?;
        }
        writer
            .flush()
            .map_err(|err| wrap_csv("dataset-flush", path, err))?;
        Ok(())
    }
}
