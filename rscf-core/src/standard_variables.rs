//! Standard forcing variable definitions.
//!
//! Each forcing variable a gridcell consumes is described by a static
//! [`VariableDefinition`]: the name used in logs and checkpoints, the CF standard names a
//! source may declare, the physical dimensions its units may have, the unit the value is
//! converted to, and whether monthly values are totals or means.
//!
//! ```rust
//! use rscf_core::standard_variables::{Quantity, VAR_PRECIPITATION, VAR_TEMPERATURE};
//!
//! assert_eq!(VAR_TEMPERATURE.model_unit, "degC");
//! assert_eq!(VAR_PRECIPITATION.quantity, Quantity::Extensive);
//! ```
//!
//! # Available Variables
//!
//! ## Required climate
//! - `VAR_TEMPERATURE` - Daily mean air temperature in degC
//! - `VAR_PRECIPITATION` - Precipitation amount in mm per period
//! - `VAR_INSOLATION` - Downwelling shortwave radiation in W m-2
//!
//! ## Optional climate
//! - `VAR_WET_DAYS` - Number of wet days per month
//! - `VAR_MIN_TEMPERATURE` / `VAR_MAX_TEMPERATURE` - Daily extremes in degC
//!
//! ## Nitrogen deposition
//! - `VAR_NDEP_DRY` / `VAR_NDEP_WET` - Monthly deposition in gN m-2

use crate::units::Dimension;
use serde::{Deserialize, Serialize};

/// How monthly values of a variable relate to its daily values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    /// Monthly value is the sum of the daily values (e.g. precipitation amount)
    Extensive,
    /// Monthly value is the mean of the daily values (e.g. temperature)
    Intensive,
}

/// Static description of a forcing variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableDefinition {
    /// Identifier used in logs, errors and checkpoints
    pub name: &'static str,
    /// CF standard names accepted from a source
    pub standard_names: &'static [&'static str],
    /// Physical dimensions a source's units may have
    pub dimensions: &'static [Dimension],
    /// Unit of values once converted
    pub model_unit: &'static str,
    pub quantity: Quantity,
}

impl VariableDefinition {
    pub fn accepts_standard_name(&self, standard_name: &str) -> bool {
        self.standard_names.iter().any(|n| *n == standard_name)
    }

    pub fn accepts_dimension(&self, dimension: Dimension) -> bool {
        self.dimensions.contains(&dimension)
    }
}

pub const VAR_TEMPERATURE: VariableDefinition = VariableDefinition {
    name: "Temperature",
    standard_names: &["air_temperature"],
    dimensions: &[Dimension::Temperature],
    model_unit: "degC",
    quantity: Quantity::Intensive,
};

pub const VAR_MIN_TEMPERATURE: VariableDefinition = VariableDefinition {
    name: "Temperature|Minimum",
    standard_names: &["air_temperature", "air_temperature_minimum"],
    dimensions: &[Dimension::Temperature],
    model_unit: "degC",
    quantity: Quantity::Intensive,
};

pub const VAR_MAX_TEMPERATURE: VariableDefinition = VariableDefinition {
    name: "Temperature|Maximum",
    standard_names: &["air_temperature", "air_temperature_maximum"],
    dimensions: &[Dimension::Temperature],
    model_unit: "degC",
    quantity: Quantity::Intensive,
};

pub const VAR_PRECIPITATION: VariableDefinition = VariableDefinition {
    name: "Precipitation",
    standard_names: &[
        "precipitation_flux",
        "precipitation_amount",
        "lwe_thickness_of_precipitation_amount",
    ],
    dimensions: &[Dimension::WaterFlux, Dimension::WaterDepth],
    model_unit: "mm",
    quantity: Quantity::Extensive,
};

pub const VAR_INSOLATION: VariableDefinition = VariableDefinition {
    name: "Insolation",
    standard_names: &[
        "surface_downwelling_shortwave_flux_in_air",
        "surface_downwelling_shortwave_flux",
    ],
    dimensions: &[Dimension::Irradiance],
    model_unit: "W m-2",
    quantity: Quantity::Intensive,
};

pub const VAR_WET_DAYS: VariableDefinition = VariableDefinition {
    name: "Wet Days",
    standard_names: &["number_of_days_with_lwe_thickness_of_precipitation_amount_above_threshold"],
    dimensions: &[Dimension::DayCount],
    model_unit: "days",
    quantity: Quantity::Extensive,
};

pub const VAR_NDEP_DRY: VariableDefinition = VariableDefinition {
    name: "Nitrogen Deposition|Dry",
    standard_names: &[
        "tendency_of_atmosphere_mass_content_of_nitrogen_compounds_due_to_dry_deposition",
    ],
    dimensions: &[Dimension::NitrogenMass, Dimension::NitrogenFlux],
    model_unit: "gN m-2",
    quantity: Quantity::Extensive,
};

pub const VAR_NDEP_WET: VariableDefinition = VariableDefinition {
    name: "Nitrogen Deposition|Wet",
    standard_names: &[
        "tendency_of_atmosphere_mass_content_of_nitrogen_compounds_due_to_wet_deposition",
    ],
    dimensions: &[Dimension::NitrogenMass, Dimension::NitrogenFlux],
    model_unit: "gN m-2",
    quantity: Quantity::Extensive,
};
