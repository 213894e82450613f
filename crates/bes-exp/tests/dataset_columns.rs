use bes_exp::{
    expand, Cell, Dataset, FailureKind, ResultRecord, SweepSpec, EUI_TOTAL, PRIORITY_COLUMNS,
};

fn records() -> Vec<ResultRecord> {
    let spec = SweepSpec::new()
        .with_dimension("wall_r", [2.0.into(), 5.0.into(), 8.0.into()])
        .with_dimension("wwr", [0.4.into()])
        .with_dimension("weather", ["W1.epw".into()])
        .with_dimension("seed", ["S1.osm".into()]);
    expand(&spec)
        .iter()
        .map(|job| {
            let mut record = ResultRecord::for_job(job);
            record.valid = true;
            record
                .metrics
                .insert(EUI_TOTAL.to_string(), 100.0 * (job.index + 1) as f64);
            record
        })
        .collect()
}

#[test]
fn invalid_records_are_dropped_and_arrival_order_kept() {
    let mut input = records();
    input.swap(0, 2);
    input[1] = input[1].clone().with_failure(FailureKind::Timeout);

    let dataset = Dataset::assemble(input).expect("assemble");
    assert_eq!(dataset.len(), 2);
    assert_eq!(
        dataset.cell(0, "run_id"),
        Some(&Cell::Text("run_0002".to_string()))
    );
    assert_eq!(
        dataset.cell(1, "run_id"),
        Some(&Cell::Text("run_0000".to_string()))
    );
    assert_eq!(dataset.cell(1, EUI_TOTAL), Some(&Cell::Number(100.0)));
}

#[test]
fn column_order_is_priority_then_lexicographic() {
    let dataset = Dataset::assemble(records()).expect("assemble");
    let columns = dataset.columns();
    assert_eq!(&columns[..PRIORITY_COLUMNS.len()], PRIORITY_COLUMNS);
    let rest = &columns[PRIORITY_COLUMNS.len()..];
    let mut sorted = rest.to_vec();
    sorted.sort();
    assert_eq!(rest, sorted.as_slice());
    assert!(rest.iter().any(|column| column == "wall_r_m2K_W"));
    assert!(rest.iter().any(|column| column == "wwr_ratio"));
    assert!(rest.iter().any(|column| column == "eui_total_from_end_uses"));
    assert!(!columns.iter().any(|column| column == "weather" || column == "seed"));

    let again = Dataset::assemble(records()).expect("assemble");
    assert_eq!(again.columns(), columns);
}

#[test]
fn zero_valid_records_is_fatal_and_writes_nothing() {
    let input: Vec<ResultRecord> = records()
        .into_iter()
        .map(|record| record.with_failure(FailureKind::MissingStore))
        .collect();
    let err = Dataset::assemble(input).expect_err("no valid runs");
    assert!(err.is_fatal());
    assert_eq!(err.info().code, "dataset-no-valid-runs");
    assert_eq!(err.info().context["records"], "3");

    let err = Dataset::assemble(Vec::new()).expect_err("empty sweep");
    assert_eq!(err.info().code, "dataset-no-valid-runs");
}

#[test]
fn csv_has_header_and_one_line_per_row() {
    let dataset = Dataset::assemble(records()).expect("assemble");
    let temp = tempfile::tempdir().expect("tmp dir");
    let path = temp.path().join("out").join("sweep_results.csv");
    dataset.write_csv(&path).expect("write");

    let text = std::fs::read_to_string(&path).expect("read");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("run_id,seed_file,weather_file,valid_sim,eui_total_MJ_m2,total_area_m2,total_volume_m3,"));
    assert!(lines[1].starts_with("run_0000,S1.osm,W1.epw,true,100,0,0,"));
}
