mod fixtures;

use std::fs;

use bes_exp::{inspect_measures, Severity};
use fixtures::Project;

fn codes(report: &bes_exp::DoctorReport, measure: &str) -> Vec<String> {
    report
        .findings
        .iter()
        .filter(|finding| finding.measure == measure)
        .map(|finding| finding.code.clone())
        .collect()
}

#[test]
fn complete_measures_dir_is_healthy() {
    let project = Project::new(&["a.epw"], &["office.osm"]);
    let report = inspect_measures(&project.root().join("measures")).expect("inspect");
    assert!(report.is_healthy());
    assert!(report.findings.is_empty());
    assert_eq!(report.measures.len(), 6);
}

#[test]
fn double_nesting_is_reported() {
    let project = Project::new(&["a.epw"], &["office.osm"]);
    let measure = project.root().join("measures").join("SetWallInsulation");
    fs::remove_file(measure.join("measure.rb")).expect("remove script");
    let nested = measure.join("SetWallInsulation");
    fs::create_dir_all(&nested).expect("nested");
    fs::write(nested.join("measure.rb"), "class M; end").expect("nested script");

    let report = inspect_measures(&project.root().join("measures")).expect("inspect");
    assert_eq!(
        codes(&report, "SetWallInsulation"),
        ["double-nesting", "missing-script"]
    );
    assert!(!report.is_healthy());
}

#[test]
fn missing_manifest_is_only_a_warning() {
    let project = Project::new(&["a.epw"], &["office.osm"]);
    let measure = project.root().join("measures").join("SetRoofInsulation");
    fs::remove_file(measure.join("measure.xml")).expect("remove manifest");

    let report = inspect_measures(&project.root().join("measures")).expect("inspect");
    assert_eq!(codes(&report, "SetRoofInsulation"), ["missing-manifest"]);
    assert_eq!(report.findings[0].severity, Severity::Warning);
    assert!(report.is_healthy());
}

#[test]
fn absent_required_measure_is_an_error() {
    let project = Project::new(&["a.epw"], &["office.osm"]);
    fs::remove_dir_all(
        project
            .root()
            .join("measures")
            .join("SetInfiltrationWeatherDriven"),
    )
    .expect("remove measure");

    let report = inspect_measures(&project.root().join("measures")).expect("inspect");
    assert_eq!(
        codes(&report, "SetInfiltrationWeatherDriven"),
        ["missing-required"]
    );
    assert_eq!(report.errors().count(), 1);
}

#[test]
fn unreadable_dir_is_a_config_error() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let err = inspect_measures(&temp.path().join("nope")).expect_err("missing dir");
    assert!(err.is_fatal());
    assert_eq!(err.info().code, "doctor-measures-dir");
}
