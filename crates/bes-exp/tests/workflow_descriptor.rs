mod fixtures;

use bes_core::errors::SweepError;
use bes_core::RSI_TO_RIP_FACTOR;
use bes_exp::{
    build_workflow, expand, from_json_slice, required_measures, Job, WorkflowDescriptor,
    WORKFLOW_FILE,
};
use fixtures::{Project, WALL_SWEEP_GRID};
use serde_json::Value;

fn first_job(config: &bes_exp::SweepConfig) -> Job {
    expand(&config.sweep).remove(0)
}

#[test]
fn steps_follow_geometry_envelope_infiltration_order() {
    let project = Project::new(&["W1.epw"], &["S1.osm"]);
    let config = project.config("", WALL_SWEEP_GRID);
    let descriptor = build_workflow(&first_job(&config), &config).expect("workflow");

    let names: Vec<&str> = descriptor
        .steps
        .iter()
        .map(|step| step.measure_dir_name.as_str())
        .collect();
    let expected: Vec<&str> = required_measures().collect();
    assert_eq!(names, expected);
    assert_eq!(
        names,
        [
            "SetBuildingScale",
            "SetWindowToWallRatio",
            "SetWallInsulation",
            "SetRoofInsulation",
            "SetFloorInsulation",
            "SetInfiltrationWeatherDriven",
        ]
    );
}

#[test]
fn thermal_resistance_is_converted_and_other_values_pass_through() {
    let project = Project::new(&["W1.epw"], &["S1.osm"]);
    let config = project.config("", WALL_SWEEP_GRID);
    let descriptor = build_workflow(&first_job(&config), &config).expect("workflow");

    let wall = descriptor.steps[2].arguments["r_value"]
        .as_f64()
        .expect("wall r");
    assert!((wall - 2.0 * RSI_TO_RIP_FACTOR).abs() < 1e-9);
    let roof = descriptor.steps[3].arguments["r_value"]
        .as_f64()
        .expect("roof r");
    assert!((roof - 3.5 * RSI_TO_RIP_FACTOR).abs() < 1e-9);

    assert_eq!(descriptor.steps[1].arguments["wwr"].as_f64(), Some(0.4));
    let infiltration = &descriptor.steps[5].arguments;
    assert_eq!(infiltration["flow_per_area"].as_f64(), Some(0.0003));
    assert_eq!(infiltration["create_if_missing"], Value::Bool(true));
    assert_eq!(infiltration["const_coeff"].as_f64(), Some(0.606));
    assert_eq!(infiltration["wind2_coeff"].as_f64(), Some(0.0));
}

#[test]
fn native_paths_point_into_the_project() {
    let project = Project::new(&["W1.epw"], &["S1.osm"]);
    let config = project.config("", WALL_SWEEP_GRID);
    let descriptor = build_workflow(&first_job(&config), &config).expect("workflow");
    assert_eq!(
        descriptor.seed_file,
        config.seeds_dir.join("S1.osm").display().to_string()
    );
    assert_eq!(
        descriptor.weather_file,
        config.weather_dir.join("W1.epw").display().to_string()
    );
    assert_eq!(
        descriptor.measure_paths,
        [config.measures_dir.display().to_string()]
    );
}

#[test]
fn container_paths_use_the_mount_point() {
    let project = Project::new(&["W1.epw"], &["S1.osm"]);
    let config = project.config("engine:\n  container: {}\n", WALL_SWEEP_GRID);
    let descriptor = build_workflow(&first_job(&config), &config).expect("workflow");
    assert_eq!(descriptor.seed_file, "/work/seeds/S1.osm");
    assert_eq!(descriptor.weather_file, "/work/weather/W1.epw");
    assert_eq!(descriptor.measure_paths, ["/work/measures"]);
}

#[test]
fn text_value_for_numeric_argument_is_rejected() {
    let project = Project::new(&["W1.epw"], &["S1.osm"]);
    let config = project.config("", &WALL_SWEEP_GRID.replace("[0.4]", "[wide]"));
    let err = build_workflow(&first_job(&config), &config).expect_err("text wwr");
    assert!(matches!(err, SweepError::InvalidArgument(_)));
    assert_eq!(err.info().context["parameter"], "wwr");
}

#[test]
fn descriptor_is_written_as_json() {
    let project = Project::new(&["W1.epw"], &["S1.osm"]);
    let config = project.config("", WALL_SWEEP_GRID);
    let descriptor = build_workflow(&first_job(&config), &config).expect("workflow");
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = descriptor.write_to(dir.path()).expect("write");
    assert_eq!(path, dir.path().join(WORKFLOW_FILE));

    let bytes = std::fs::read(&path).expect("read");
    let parsed: WorkflowDescriptor = from_json_slice(&bytes).expect("parse");
    assert_eq!(parsed, descriptor);
    let raw: Value = serde_json::from_slice(&bytes).expect("json");
    let first_step_keys: Vec<&str> = raw["steps"][0]["arguments"]
        .as_object()
        .expect("arguments")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(first_step_keys.len(), 3);
}
