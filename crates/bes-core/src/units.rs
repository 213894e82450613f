//! Linear unit conversion between the sweep's SI values and the engine's inputs.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SweepError};
use crate::types::ParamValue;

/// 1 m²·K/W expressed in ft²·°F·h/Btu.
pub const RSI_TO_RIP_FACTOR: f64 = 5.678263;

/// Physical quantities the workflow builder converts at the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quantity {
    /// Ratios and scale factors.
    Dimensionless,
    /// Thermal resistance, R-SI (m²·K/W) on our side and R-IP on the engine side.
    ThermalResistance,
    /// Infiltration flow per exterior area (m³/s·m²); the engine takes SI.
    AirflowPerArea,
}

impl Quantity {
    /// Multiplicative factor from the internal unit to the engine unit.
    pub const fn factor(self) -> f64 {
        match self {
            Quantity::Dimensionless | Quantity::AirflowPerArea => 1.0,
            Quantity::ThermalResistance => RSI_TO_RIP_FACTOR,
        }
    }

    /// Converts a sweep value of this quantity into the engine's unit.
    pub fn to_engine(self, value: &ParamValue) -> Result<f64, SweepError> {
        convert_value(value, self.factor())
    }
}

/// Converts `value` with a linear `factor`.
pub fn convert(value: f64, factor: f64) -> f64 {
    value * factor
}

/// Converts a sweep value, rejecting non-numeric inputs.
pub fn convert_value(value: &ParamValue, factor: f64) -> Result<f64, SweepError> {
    match value.as_f64() {
        Some(number) => Ok(convert(number, factor)),
        None => Err(SweepError::InvalidArgument(
            ErrorInfo::new("unit-non-numeric", "cannot convert a non-numeric value")
                .with_context("value", value.to_string()),
        )),
    }
}
