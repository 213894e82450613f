#![deny(missing_docs)]
#![doc = "Core types shared by the building energy sweep crates: parameter values, unit conversion and the error surface."]

pub mod errors;
pub mod provenance;
mod types;
pub mod units;

pub use errors::{ErrorInfo, SweepError};
pub use provenance::{RunProvenance, SchemaVersion};
pub use types::ParamValue;
pub use units::{convert, convert_value, Quantity, RSI_TO_RIP_FACTOR};
