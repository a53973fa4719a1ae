//! Forcing configuration
//!
//! Loaded from TOML. Every field has a default, so a partial document (or an empty one)
//! gives a usable configuration:
//!
//! ```toml
//! spinup_years = 1000
//! calendar = "gregorian"
//!
//! [temperature_bounds]
//! minimum = -80.0
//! maximum = 60.0
//! ```

use rscf_core::calendar::CalendarMode;
use rscf_core::errors::{ForcingError, ForcingResult};
use rscf_core::interpolate::Bounds;
use rscf_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration shared by every gridcell of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcingConfig {
    /// Number of simulated years before the historical period
    /// default: 500
    pub spinup_years: usize,

    /// Number of years at the start of the historical record the spin-up cycle is built from
    /// default: 30
    pub spinup_cycle_years: usize,

    /// Simulated calendar, fixed for the whole run
    /// default: no_leap
    pub calendar: CalendarMode,

    /// Remove the linear trend from the spin-up cycle
    /// default: true
    pub detrend_spinup: bool,

    /// Seed of the wet-day precipitation generator
    /// default: 12345678
    pub initial_seed: u64,

    /// Dry nitrogen deposition used when no deposition source is supplied
    /// unit: gN m-2 yr-1
    /// default: 0.0
    pub ndep_dry_annual: FloatValue,

    /// Wet nitrogen deposition used when no deposition source is supplied
    /// unit: gN m-2 yr-1
    /// default: 0.0
    pub ndep_wet_annual: FloatValue,

    /// CO2 during spin-up. Defaults to the first value of the CO2 record.
    /// unit: ppm
    pub co2_spinup: Option<FloatValue>,

    /// Optional upper limit of the slope projection factor for landform insolation.
    /// Unset, sun-facing slopes receive the full projection.
    /// unit: dimensionless
    pub max_slope_gain: Option<FloatValue>,

    /// Clamp for interpolated daily temperatures
    /// unit: degC
    /// default: -100 to 100
    pub temperature_bounds: Bounds,

    /// Clamp for interpolated daily insolation
    /// unit: W m-2
    /// default: 0 to 1500
    pub insolation_bounds: Bounds,
}

impl Default for ForcingConfig {
    fn default() -> Self {
        Self {
            spinup_years: 500,
            spinup_cycle_years: 30,
            calendar: CalendarMode::NoLeap,
            detrend_spinup: true,
            initial_seed: 12345678,
            ndep_dry_annual: 0.0,
            ndep_wet_annual: 0.0,
            co2_spinup: None,
            max_slope_gain: None,
            temperature_bounds: Bounds::new(-100.0, 100.0),
            insolation_bounds: Bounds::new(0.0, 1500.0),
        }
    }
}

impl ForcingConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> ForcingResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| ForcingError::Parse {
            what: "forcing configuration".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> ForcingResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> ForcingResult<String> {
        toml::to_string(self).map_err(|e| ForcingError::Parse {
            what: "forcing configuration".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> ForcingResult<()> {
        let invalid = |reason: String| Err(ForcingError::InvalidConfiguration(reason));

        if self.spinup_cycle_years == 0 {
            return invalid("spinup_cycle_years must be at least 1".to_string());
        }
        if self.spinup_cycle_years > self.spinup_years && self.spinup_years > 0 {
            return invalid(format!(
                "spin-up cycle of {} years is longer than the {} year spin-up",
                self.spinup_cycle_years, self.spinup_years
            ));
        }
        for (name, bounds) in [
            ("temperature_bounds", &self.temperature_bounds),
            ("insolation_bounds", &self.insolation_bounds),
        ] {
            if !bounds.is_valid() {
                return invalid(format!(
                    "{name} minimum {} exceeds maximum {}",
                    bounds.minimum, bounds.maximum
                ));
            }
        }
        if self.insolation_bounds.minimum < 0.0 {
            return invalid("insolation_bounds must not allow negative insolation".to_string());
        }
        if self.ndep_dry_annual < 0.0 || self.ndep_wet_annual < 0.0 {
            return invalid("nitrogen deposition must not be negative".to_string());
        }
        if let Some(gain) = self.max_slope_gain {
            if gain.is_nan() || gain < 1.0 {
                return invalid(format!("max_slope_gain {gain} must be at least 1"));
            }
        }
        if let Some(co2) = self.co2_spinup {
            if co2 <= 0.0 {
                return invalid(format!("co2_spinup {co2} must be positive"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ForcingConfig::from_toml_str("").unwrap();
        assert_eq!(config, ForcingConfig::default());
        assert_eq!(config.spinup_years, 500);
        assert_eq!(config.calendar, CalendarMode::NoLeap);
        assert_eq!(config.max_slope_gain, None);
    }

    #[test]
    fn partial_document() {
        let config = ForcingConfig::from_toml_str(
            r#"
            spinup_years = 1000
            calendar = "gregorian"
            co2_spinup = 276.0
            max_slope_gain = 4.0

            [temperature_bounds]
            minimum = -80.0
            maximum = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(config.spinup_years, 1000);
        assert_eq!(config.calendar, CalendarMode::Gregorian);
        assert_eq!(config.co2_spinup, Some(276.0));
        assert_eq!(config.max_slope_gain, Some(4.0));
        assert_eq!(config.temperature_bounds, Bounds::new(-80.0, 60.0));
        assert_eq!(config.spinup_cycle_years, 30);
        assert!(config.detrend_spinup);
    }

    #[test]
    fn round_trip() {
        let config = ForcingConfig {
            initial_seed: 99,
            ..Default::default()
        };
        let serialised = config.to_toml_string().unwrap();
        assert_eq!(ForcingConfig::from_toml_str(&serialised).unwrap(), config);

        let json = serde_json::to_string(&config).unwrap();
        let from_json: ForcingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(from_json, config);
    }

    #[test]
    fn invalid_configurations() {
        assert!(ForcingConfig::from_toml_str("spinup_cycle_years = 0").is_err());
        assert!(ForcingConfig::from_toml_str("spinup_years = 10").is_err());
        assert!(ForcingConfig::from_toml_str("max_slope_gain = 0.5").is_err());
        assert!(ForcingConfig::from_toml_str(
            "[insolation_bounds]\nminimum = 10.0\nmaximum = 5.0"
        )
        .is_err());
        assert!(matches!(
            ForcingConfig::from_toml_str("spinup_years = \"many\""),
            Err(ForcingError::Parse { .. })
        ));
    }
}
