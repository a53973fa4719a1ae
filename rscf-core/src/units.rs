//! Unit normalization and conversion for forcing variables.
//!
//! Sources declare their units as free-form strings. This module normalizes those strings,
//! looks them up in a small registry of units that forcing data actually uses, and converts
//! values into the units the rest of the pipeline works in (see
//! [`VariableDefinition::model_unit`](crate::standard_variables::VariableDefinition)).
//!
//! # Supported Syntax
//!
//! | Notation | Normalized |
//! |----------|------------|
//! | `W/m^2`, `W m**-2`, `W  m-2` | `W m-2` |
//! | `kg/m2/s`, `kg m-2 s-1` | `kg m-2 s-1` |
//! | `mm/day` | `mm day-1` |
//!
//! # Conversion
//!
//! Values are converted as `value * scale + offset`. Rates are then integrated over the
//! period a value covers, so that a monthly mean precipitation rate becomes a monthly
//! total before any disaggregation happens:
//!
//! $$P_{mm} = P_{kg\,m^{-2}\,s^{-1}} \times 86400 \times n_{days}$$
//!
//! ```rust
//! use rscf_core::standard_variables::{VAR_PRECIPITATION, VAR_TEMPERATURE};
//! use rscf_core::units::ForcingUnit;
//!
//! let kelvin = ForcingUnit::parse_for("K", &VAR_TEMPERATURE).unwrap();
//! assert!((kelvin.to_model_units(273.15, 1) - 0.0).abs() < 1e-12);
//!
//! let flux = ForcingUnit::parse_for("kg/m2/s", &VAR_PRECIPITATION).unwrap();
//! assert!((flux.to_model_units(1.0e-5, 30) - 25.92).abs() < 1e-9);
//! ```

use crate::errors::{ForcingError, ForcingResult};
use crate::standard_variables::VariableDefinition;
use crate::timeseries::{FloatValue, TimeSeriesSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

pub const SECONDS_PER_DAY: FloatValue = 86400.0;
pub const KELVIN_OFFSET: FloatValue = 273.15;

/// Physical dimension of a forcing unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Temperature,
    /// Water per area per time (precipitation rate)
    WaterFlux,
    /// Water per area (precipitation amount)
    WaterDepth,
    Irradiance,
    DayCount,
    NitrogenMass,
    NitrogenFlux,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Time base of a rate unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateBase {
    /// Not a rate
    None,
    PerSecond,
    PerDay,
}

/// A registered unit with its conversion into model units.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForcingUnit {
    pub symbol: &'static str,
    pub dimension: Dimension,
    pub scale: FloatValue,
    pub offset: FloatValue,
    pub rate: RateBase,
}

const fn unit(
    symbol: &'static str,
    dimension: Dimension,
    scale: FloatValue,
    offset: FloatValue,
    rate: RateBase,
) -> ForcingUnit {
    ForcingUnit {
        symbol,
        dimension,
        scale,
        offset,
        rate,
    }
}

/// Registered units, keyed by their normalized symbol.
///
/// A symbol may appear more than once with different dimensions (`kg m-2 s-1` is both a
/// water flux and a nitrogen flux); the variable being read decides which one applies.
static KNOWN_UNITS: &[ForcingUnit] = &[
    unit("K", Dimension::Temperature, 1.0, -KELVIN_OFFSET, RateBase::None),
    unit("degC", Dimension::Temperature, 1.0, 0.0, RateBase::None),
    unit("degrees_C", Dimension::Temperature, 1.0, 0.0, RateBase::None),
    unit("C", Dimension::Temperature, 1.0, 0.0, RateBase::None),
    unit("kg m-2 s-1", Dimension::WaterFlux, 1.0, 0.0, RateBase::PerSecond),
    unit("mm s-1", Dimension::WaterFlux, 1.0, 0.0, RateBase::PerSecond),
    unit("mm day-1", Dimension::WaterFlux, 1.0, 0.0, RateBase::PerDay),
    unit("mm d-1", Dimension::WaterFlux, 1.0, 0.0, RateBase::PerDay),
    unit("mm", Dimension::WaterDepth, 1.0, 0.0, RateBase::None),
    unit("kg m-2", Dimension::WaterDepth, 1.0, 0.0, RateBase::None),
    unit("m", Dimension::WaterDepth, 1000.0, 0.0, RateBase::None),
    unit("W m-2", Dimension::Irradiance, 1.0, 0.0, RateBase::None),
    unit("days", Dimension::DayCount, 1.0, 0.0, RateBase::None),
    unit("day", Dimension::DayCount, 1.0, 0.0, RateBase::None),
    unit("d", Dimension::DayCount, 1.0, 0.0, RateBase::None),
    unit("1", Dimension::DayCount, 1.0, 0.0, RateBase::None),
    unit("gN m-2", Dimension::NitrogenMass, 1.0, 0.0, RateBase::None),
    unit("g m-2", Dimension::NitrogenMass, 1.0, 0.0, RateBase::None),
    unit("mgN m-2", Dimension::NitrogenMass, 1.0e-3, 0.0, RateBase::None),
    unit("kgN ha-1", Dimension::NitrogenMass, 0.1, 0.0, RateBase::None),
    unit("kgN m-2", Dimension::NitrogenMass, 1000.0, 0.0, RateBase::None),
    unit("kgN m-2 s-1", Dimension::NitrogenFlux, 1000.0, 0.0, RateBase::PerSecond),
    unit("kg m-2 s-1", Dimension::NitrogenFlux, 1000.0, 0.0, RateBase::PerSecond),
    unit("gN m-2 day-1", Dimension::NitrogenFlux, 1.0, 0.0, RateBase::PerDay),
];

static UNIT_REGISTRY: LazyLock<HashMap<&'static str, Vec<ForcingUnit>>> = LazyLock::new(|| {
    let mut registry: HashMap<&'static str, Vec<ForcingUnit>> = HashMap::new();
    for info in KNOWN_UNITS {
        registry.entry(info.symbol).or_default().push(*info);
    }
    registry
});

/// Normalize a unit string.
///
/// Collapses whitespace, drops `^`/`**` exponent markers and rewrites `/` denominators as
/// negative exponents.
pub fn normalize(input: &str) -> String {
    let cleaned = input.trim().replace("**", "").replace('^', "").replace('*', " ");
    let mut parts = cleaned.split('/');
    let mut tokens: Vec<String> = parts
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    for denominator in parts {
        for token in denominator.split_whitespace() {
            tokens.push(invert_token(token));
        }
    }
    tokens.join(" ")
}

fn invert_token(token: &str) -> String {
    let split = token
        .find(|c: char| c == '-' || c.is_ascii_digit())
        .unwrap_or(token.len());
    let (name, exponent) = token.split_at(split);
    let exponent: i32 = exponent.parse().unwrap_or(1);
    match -exponent {
        1 => name.to_string(),
        e => format!("{name}{e}"),
    }
}

impl ForcingUnit {
    /// Look up a unit string for a given variable.
    ///
    /// Returns `UnknownUnit` if the symbol is not registered and `WrongUnits` if it is
    /// registered but has a dimension the variable does not accept.
    pub fn parse_for(input: &str, definition: &VariableDefinition) -> ForcingResult<Self> {
        let normalized = normalize(input);
        let candidates = UNIT_REGISTRY
            .get(normalized.as_str())
            .ok_or_else(|| ForcingError::UnknownUnit(input.to_string()))?;

        candidates
            .iter()
            .find(|info| definition.accepts_dimension(info.dimension))
            .copied()
            .ok_or_else(|| ForcingError::WrongUnits {
                variable: definition.name.to_string(),
                expected: format!("{:?}", definition.dimensions),
                found: input.to_string(),
            })
    }

    pub fn is_rate(&self) -> bool {
        self.rate != RateBase::None
    }

    /// Convert a value covering `period_days` days into model units.
    pub fn to_model_units(&self, value: FloatValue, period_days: usize) -> FloatValue {
        let converted = value * self.scale + self.offset;
        match self.rate {
            RateBase::None => converted,
            RateBase::PerDay => converted * period_days as FloatValue,
            RateBase::PerSecond => converted * SECONDS_PER_DAY * period_days as FloatValue,
        }
    }
}

/// Validate a source's metadata against a variable definition.
///
/// Runs once at gridcell setup. Returns the unit used to convert the source's values.
pub fn validate_source(
    source: &dyn TimeSeriesSource,
    definition: &VariableDefinition,
) -> ForcingResult<ForcingUnit> {
    if !definition.accepts_standard_name(source.standard_name()) {
        return Err(ForcingError::WrongStandardName {
            variable: definition.name.to_string(),
            expected: definition.standard_names.join(" or "),
            found: source.standard_name().to_string(),
        });
    }
    ForcingUnit::parse_for(source.units(), definition)
}
