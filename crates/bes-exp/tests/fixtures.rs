#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bes_core::errors::SweepError;
use bes_exp::{
    load_config, required_measures, EngineStatus, Invocation, SimulationEngine, SweepConfig,
    RESULT_STORE,
};
use rusqlite::{params, Connection};
use tempfile::TempDir;

/// Grid with one value for every workflow parameter except `wall_r`.
pub const WALL_SWEEP_GRID: &str = "\
grid:
  scale_x: [1.0]
  scale_y: [1.0]
  scale_z: [1.0]
  wwr: [0.4]
  wall_r: [2.0, 5.0]
  roof_r: [3.5]
  floor_r: [1.0]
  infil: [0.0003]
";

/// Project tree with weather, seeds and every required measure.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new(weather: &[&str], seeds: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("temp project");
        let root = dir.path();
        fs::create_dir_all(root.join("weather")).expect("weather dir");
        fs::create_dir_all(root.join("seeds")).expect("seeds dir");
        for name in weather {
            fs::write(root.join("weather").join(name), "LOCATION").expect("weather file");
        }
        for name in seeds {
            fs::write(root.join("seeds").join(name), "OS:Version").expect("seed file");
        }
        for measure in required_measures() {
            let measure_dir = root.join("measures").join(measure);
            fs::create_dir_all(&measure_dir).expect("measure dir");
            fs::write(measure_dir.join("measure.rb"), "class M; end").expect("measure.rb");
            fs::write(measure_dir.join("measure.xml"), "<measure/>").expect("measure.xml");
        }
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `body` as the configuration file and returns its path.
    pub fn write_config(&self, body: &str) -> PathBuf {
        let path = self.root().join("sweep.yaml");
        fs::write(&path, body).expect("write config");
        path
    }

    /// Loads a configuration made of `extra` followed by `grid`.
    pub fn config(&self, extra: &str, grid: &str) -> SweepConfig {
        let path = self.write_config(&format!("{extra}{grid}"));
        load_config(path).expect("load config")
    }
}

/// One `TabularDataWithStrings` row: (table, row, column, value).
pub type TabularRow<'a> = (&'a str, &'a str, &'a str, &'a str);

/// Creates a result store holding `rows`.
pub fn write_store(path: &Path, rows: &[TabularRow<'_>]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("store dir");
    }
    let conn = Connection::open(path).expect("open store");
    conn.execute_batch(
        "CREATE TABLE TabularDataWithStrings (
            ReportName TEXT,
            ReportForString TEXT,
            TableName TEXT,
            RowName TEXT,
            ColumnName TEXT,
            Units TEXT,
            Value TEXT
        );",
    )
    .expect("create table");
    for (table, row, column, value) in rows {
        conn.execute(
            "INSERT INTO TabularDataWithStrings
             (ReportName, ReportForString, TableName, RowName, ColumnName, Units, Value)
             VALUES ('AnnualBuildingUtilityPerformanceSummary', 'Entire Facility', ?1, ?2, ?3, '', ?4)",
            params![table, row, column, value],
        )
        .expect("insert row");
    }
}

/// Rows for a building of `area` m² that used `heating_gj` GJ for heating.
pub fn heating_store_rows<'a>(area: &'a str, heating_gj: &'a str) -> Vec<TabularRow<'a>> {
    vec![
        ("Building Area", "Total Building Area", "Area", area),
        ("Building Area", "Net Conditioned Building Volume", "Volume", "300.00"),
        ("End Uses", "Heating", "Electricity", heating_gj),
        ("End Uses", "Heating", "Natural Gas", "0.00"),
    ]
}

type Behaviour = dyn Fn(&Invocation<'_>) -> Result<EngineStatus, SweepError> + Send + Sync;

/// In-process engine whose behaviour is chosen per test.
pub struct FakeEngine {
    behaviour: Box<Behaviour>,
}

impl FakeEngine {
    pub fn new<F>(behaviour: F) -> Arc<Self>
    where
        F: Fn(&Invocation<'_>) -> Result<EngineStatus, SweepError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            behaviour: Box::new(behaviour),
        })
    }

    /// Engine that leaves a 100 m² store with 50 GJ of heating behind for every job.
    pub fn always_succeeds() -> Arc<Self> {
        Self::new(|invocation| {
            write_store(
                &invocation.workdir.join(RESULT_STORE),
                &heating_store_rows("100.00", "50.00"),
            );
            Ok(EngineStatus::Exited { code: Some(0) })
        })
    }
}

impl SimulationEngine for FakeEngine {
    fn run(&self, invocation: &Invocation<'_>) -> Result<EngineStatus, SweepError> {
        (self.behaviour)(invocation)
    }
}
