use std::fs;
use std::path::{Path, PathBuf};

use bes_core::errors::{ErrorInfo, SweepError};
use bes_core::Quantity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{SweepConfig, SEED_KEY, WEATHER_KEY};
use crate::grid::Job;
use crate::serde::to_pretty_json_bytes;

/// File name of the descriptor inside a job's scratch directory.
pub const WORKFLOW_FILE: &str = "workflow.osw";

/// Binds one sweep parameter to one measure argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArgumentBinding {
    /// Sweep dimension supplying the value.
    pub parameter: &'static str,
    /// Argument key the measure expects.
    pub argument: &'static str,
    /// Quantity, which selects the conversion factor.
    pub quantity: Quantity,
    /// Dataset column carrying the unconverted value.
    pub column: &'static str,
}

/// Constant measure argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedArgument {
    /// Boolean flag.
    Bool(bool),
    /// Numeric coefficient.
    Number(f64),
}

impl FixedArgument {
    fn to_value(self) -> Value {
        match self {
            FixedArgument::Bool(flag) => Value::Bool(flag),
            FixedArgument::Number(number) => Value::from(number),
        }
    }
}

/// One engine step and the arguments it receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTemplate {
    /// Measure directory name.
    pub measure: &'static str,
    /// Arguments filled from the job.
    pub bindings: &'static [ArgumentBinding],
    /// Arguments that are the same for every job.
    pub fixed: &'static [(&'static str, FixedArgument)],
}

const fn bind(
    parameter: &'static str,
    argument: &'static str,
    quantity: Quantity,
    column: &'static str,
) -> ArgumentBinding {
    ArgumentBinding {
        parameter,
        argument,
        quantity,
        column,
    }
}

/// Engine steps in application order: geometry, then envelope, then infiltration.
pub const STEPS: &[StepTemplate] = &[
    StepTemplate {
        measure: "SetBuildingScale",
        bindings: &[
            bind("scale_x", "x_scale", Quantity::Dimensionless, "scale_x_factor"),
            bind("scale_y", "y_scale", Quantity::Dimensionless, "scale_y_factor"),
            bind("scale_z", "z_scale", Quantity::Dimensionless, "scale_z_factor"),
        ],
        fixed: &[],
    },
    StepTemplate {
        measure: "SetWindowToWallRatio",
        bindings: &[bind("wwr", "wwr", Quantity::Dimensionless, "wwr_ratio")],
        fixed: &[],
    },
    StepTemplate {
        measure: "SetWallInsulation",
        bindings: &[bind(
            "wall_r",
            "r_value",
            Quantity::ThermalResistance,
            "wall_r_m2K_W",
        )],
        fixed: &[],
    },
    StepTemplate {
        measure: "SetRoofInsulation",
        bindings: &[bind(
            "roof_r",
            "r_value",
            Quantity::ThermalResistance,
            "roof_r_m2K_W",
        )],
        fixed: &[],
    },
    StepTemplate {
        measure: "SetFloorInsulation",
        bindings: &[bind(
            "floor_r",
            "r_value",
            Quantity::ThermalResistance,
            "floor_r_m2K_W",
        )],
        fixed: &[],
    },
    StepTemplate {
        measure: "SetInfiltrationWeatherDriven",
        bindings: &[bind(
            "infil",
            "flow_per_area",
            Quantity::AirflowPerArea,
            "infil_rate_m3_s_m2",
        )],
        fixed: &[
            ("create_if_missing", FixedArgument::Bool(true)),
            ("const_coeff", FixedArgument::Number(0.606)),
            ("temp_coeff", FixedArgument::Number(0.03636)),
            ("wind_coeff", FixedArgument::Number(0.1177)),
            ("wind2_coeff", FixedArgument::Number(0.0)),
        ],
    },
];

/// Sweep parameters every job must define.
pub fn required_parameters() -> impl Iterator<Item = &'static str> {
    STEPS
        .iter()
        .flat_map(|step| step.bindings.iter().map(|binding| binding.parameter))
}

/// Measure directories the workflow references.
pub fn required_measures() -> impl Iterator<Item = &'static str> {
    STEPS.iter().map(|step| step.measure)
}

/// Dataset column for a sweep parameter.
pub fn report_column(parameter: &str) -> String {
    STEPS
        .iter()
        .flat_map(|step| step.bindings.iter())
        .find(|binding| binding.parameter == parameter)
        .map(|binding| binding.column.to_string())
        .unwrap_or_else(|| parameter.to_string())
}

/// One named processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Measure directory name.
    pub measure_dir_name: String,
    /// Arguments in engine units.
    pub arguments: IndexMap<String, Value>,
}

/// Structured input the engine consumes for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDescriptor {
    /// Seed model path as seen by the engine.
    pub seed_file: String,
    /// Weather file path as seen by the engine.
    pub weather_file: String,
    /// Measure search path.
    pub measure_paths: Vec<String>,
    /// Ordered steps.
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDescriptor {
    /// Writes the descriptor into `dir` and returns its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, SweepError> {
        let path = dir.join(WORKFLOW_FILE);
        let bytes = to_pretty_json_bytes(self)?;
        fs::write(&path, bytes).map_err(|err| {
            SweepError::Io(
                ErrorInfo::new("workflow-write", "failed to write workflow descriptor")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(path)
    }
}

/// Builds the descriptor for `job`, converting values to engine units.
pub fn build_workflow(job: &Job, config: &SweepConfig) -> Result<WorkflowDescriptor, SweepError> {
    let mut steps = Vec::with_capacity(STEPS.len());
    for template in STEPS {
        let mut arguments = IndexMap::new();
        for binding in template.bindings {
            let value = job_param(job, binding.parameter)?;
            let converted = binding.quantity.to_engine(value).map_err(|err| {
                SweepError::InvalidArgument(
                    err.info()
                        .clone()
                        .with_context("run_id", job.run_id.clone())
                        .with_context("parameter", binding.parameter),
                )
            })?;
            arguments.insert(binding.argument.to_string(), Value::from(converted));
        }
        for (name, fixed) in template.fixed {
            arguments.insert((*name).to_string(), fixed.to_value());
        }
        steps.push(WorkflowStep {
            measure_dir_name: template.measure.to_string(),
            arguments,
        });
    }

    let seed = job_param(job, SEED_KEY)?.to_string();
    let weather = job_param(job, WEATHER_KEY)?.to_string();
    Ok(WorkflowDescriptor {
        seed_file: config.mapping.map(&config.seeds_dir.join(seed))?,
        weather_file: config.mapping.map(&config.weather_dir.join(weather))?,
        measure_paths: vec![config.mapping.map(&config.measures_dir)?],
        steps,
    })
}

fn job_param<'a>(job: &'a Job, name: &str) -> Result<&'a bes_core::ParamValue, SweepError> {
    job.param(name).ok_or_else(|| {
        SweepError::InvalidArgument(
            ErrorInfo::new("workflow-missing-parameter", "job lacks a workflow parameter")
                .with_context("run_id", job.run_id.clone())
                .with_context("parameter", name),
        )
    })
}
