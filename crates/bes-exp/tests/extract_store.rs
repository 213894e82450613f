mod fixtures;

use bes_exp::{
    expand, extract_record, locate_store, read_metrics, Extraction, FailureKind, ResultRecord,
    ResultStore, SweepSpec, EUI_TOTAL, EUI_TOTAL_FROM_END_USES, RESULT_STORE, TOTAL_AREA,
    TOTAL_VOLUME,
};
use fixtures::{heating_store_rows, write_store};

fn blank_record() -> ResultRecord {
    let spec = SweepSpec::new()
        .with_dimension("wall_r", [2.0.into()])
        .with_dimension("weather", ["W1.epw".into()])
        .with_dimension("seed", ["S1.osm".into()]);
    ResultRecord::for_job(&expand(&spec)[0])
}

#[test]
fn heating_intensity_is_scaled_by_area() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let store = temp.path().join(RESULT_STORE);
    write_store(&store, &heating_store_rows("100.00", "50.00"));

    let record = extract_record(Some(store.as_path()), blank_record());
    assert!(record.valid);
    assert_eq!(record.metric("eui_heating_MJ_m2"), 500.0);
    assert_eq!(record.metric(TOTAL_AREA), 100.0);
    assert_eq!(record.metric(TOTAL_VOLUME), 300.0);
    assert_eq!(record.metric("eui_cooling_MJ_m2"), 0.0);
    assert!(record.failure.is_none());
}

#[test]
fn authoritative_total_wins_over_end_use_sum() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let store = temp.path().join(RESULT_STORE);
    let mut rows = heating_store_rows("100.00", "50.00");
    rows.push((
        "Site and Source Energy",
        "Total Site Energy",
        "Energy Per Total Building Area",
        "612.25",
    ));
    write_store(&store, &rows);

    let record = extract_record(Some(store.as_path()), blank_record());
    assert_eq!(record.metric(EUI_TOTAL), 612.25);
    assert!(!record.total_from_end_uses);
}

#[test]
fn missing_total_falls_back_to_flagged_end_use_sum() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let store = temp.path().join(RESULT_STORE);
    let mut rows = heating_store_rows("200.00", "50.00");
    rows.push(("End Uses", "Interior Lighting", "Electricity", "20.00"));
    write_store(&store, &rows);

    let record = extract_record(Some(store.as_path()), blank_record());
    assert!(record.valid);
    assert_eq!(record.metric("eui_heating_MJ_m2"), 250.0);
    assert_eq!(record.metric("eui_interior_lighting_MJ_m2"), 100.0);
    assert_eq!(record.metric(EUI_TOTAL), 350.0);
    assert!(record.total_from_end_uses);
    assert_eq!(
        record.cells().get(EUI_TOTAL_FROM_END_USES).map(ToString::to_string),
        Some("true".to_string())
    );
}

#[test]
fn non_numeric_end_use_cells_are_skipped() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let store = temp.path().join(RESULT_STORE);
    let mut rows = heating_store_rows("100.00", "50.00");
    rows.push(("End Uses", "Heating", "Water", ""));
    rows.push(("End Uses", "Heating", "District Heating", "n/a"));
    write_store(&store, &rows);

    let handle = ResultStore::open(&store).expect("open store");
    match read_metrics(&handle).expect("read metrics") {
        Extraction::Complete(metrics) => {
            assert_eq!(metrics.end_uses[0], ("Heating", 500.0));
        }
        other => panic!("unexpected extraction {other:?}"),
    }
}

#[test]
fn non_positive_area_invalidates_record() {
    let temp = tempfile::tempdir().expect("tmp dir");
    for area in ["0.00", "-5.0"] {
        let store = temp.path().join(format!("area{area}")).join(RESULT_STORE);
        write_store(&store, &heating_store_rows(area, "50.00"));
        let record = extract_record(Some(store.as_path()), blank_record());
        assert!(!record.valid);
        assert_eq!(record.failure, Some(FailureKind::NonPositiveArea));
        assert!(record.metrics.values().all(|value| *value == 0.0));
    }
}

#[test]
fn missing_area_row_counts_as_zero() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let store = temp.path().join(RESULT_STORE);
    write_store(&store, &[("End Uses", "Heating", "Electricity", "50.00")]);
    let record = extract_record(Some(store.as_path()), blank_record());
    assert_eq!(record.failure, Some(FailureKind::NonPositiveArea));
}

#[test]
fn missing_store_yields_default_metrics() {
    let temp = tempfile::tempdir().expect("tmp dir");
    assert!(locate_store(temp.path()).is_none());

    let record = extract_record(None, blank_record());
    assert!(!record.valid);
    assert_eq!(record.failure, Some(FailureKind::MissingStore));

    let absent = temp.path().join(RESULT_STORE);
    let record = extract_record(Some(absent.as_path()), blank_record());
    assert_eq!(record.failure, Some(FailureKind::MissingStore));
}

#[test]
fn empty_store_file_is_not_located() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let store = temp.path().join(RESULT_STORE);
    std::fs::create_dir_all(store.parent().expect("parent")).expect("run dir");
    std::fs::write(&store, b"").expect("empty store");
    assert!(locate_store(temp.path()).is_none());
}

#[test]
fn store_without_tabular_table_is_a_read_failure() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let store = temp.path().join(RESULT_STORE);
    std::fs::create_dir_all(store.parent().expect("parent")).expect("run dir");
    let conn = rusqlite::Connection::open(&store).expect("open");
    conn.execute_batch("CREATE TABLE Other (x INTEGER);")
        .expect("create");
    drop(conn);

    let record = extract_record(Some(store.as_path()), blank_record());
    assert!(!record.valid);
    assert_eq!(record.failure, Some(FailureKind::StoreRead));
}

#[test]
fn extraction_does_not_modify_the_store() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let store = temp.path().join(RESULT_STORE);
    write_store(&store, &heating_store_rows("100.00", "50.00"));
    let before = std::fs::read(&store).expect("read before");
    let _ = extract_record(Some(store.as_path()), blank_record());
    let after = std::fs::read(&store).expect("read after");
    assert_eq!(before, after);
}
