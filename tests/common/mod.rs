#![allow(dead_code)]

use rscf::{Co2Record, ForcingConfig, GridcellForcingBuilder, SharedSource};
use rscf_components::components::{LandformRecord, NO_ASPECT};
use rscf_core::timeseries::{FloatValue, InMemorySource, SourceCalendar};
use std::sync::Arc;

pub const WET_DAYS_STANDARD_NAME: &str =
    "number_of_days_with_lwe_thickness_of_precipitation_amount_above_threshold";

pub fn daily(
    name: &str,
    standard_name: &str,
    units: &str,
    values: Vec<FloatValue>,
) -> SharedSource {
    daily_from(SourceCalendar::NoLeap, 1901, name, standard_name, units, values)
}

/// A daily source on `calendar` starting on the first of January of `first_year`
pub fn daily_from(
    calendar: SourceCalendar,
    first_year: i32,
    name: &str,
    standard_name: &str,
    units: &str,
    values: Vec<FloatValue>,
) -> SharedSource {
    Arc::new(InMemorySource::daily(
        name,
        standard_name,
        units,
        calendar,
        first_year,
        values,
    ))
}

/// A monthly source repeating `climatology` for `years` years, with `trend` added per year
pub fn monthly(
    name: &str,
    standard_name: &str,
    units: &str,
    climatology: [FloatValue; 12],
    years: usize,
    trend: FloatValue,
) -> SharedSource {
    let values = (0..12 * years)
        .map(|i| climatology[i % 12] + trend * (i / 12) as FloatValue)
        .collect();
    Arc::new(InMemorySource::monthly(
        name,
        standard_name,
        units,
        SourceCalendar::NoLeap,
        1901,
        values,
    ))
}

pub fn landforms() -> Vec<LandformRecord> {
    vec![
        LandformRecord {
            id: 0,
            fraction: 0.4,
            elevation: 0.0,
            slope: 0.0,
            aspect: NO_ASPECT,
            aspect_corrected_slope: 0.0,
            soil_depth_modifier: 1.0,
        },
        LandformRecord {
            id: 1,
            fraction: 0.35,
            elevation: 1400.0,
            slope: 25.0,
            aspect: 190.0,
            aspect_corrected_slope: 22.0,
            soil_depth_modifier: 0.6,
        },
        LandformRecord {
            id: 2,
            fraction: 0.25,
            elevation: 1100.0,
            slope: 18.0,
            aspect: 10.0,
            aspect_corrected_slope: 15.0,
            soil_depth_modifier: 0.8,
        },
    ]
}

/// A mid-latitude gridcell driven by five years of monthly data, with every optional input
pub fn monthly_gridcell(config: ForcingConfig, latitude: FloatValue) -> GridcellForcingBuilder {
    let years = 5;
    let mut builder = GridcellForcingBuilder::new(config);
    builder
        .with_location(8.5, latitude, 900.0)
        .with_temperature(monthly(
            "tas",
            "air_temperature",
            "K",
            [268.0, 270.0, 275.0, 280.0, 285.0, 289.0, 291.0, 290.0, 286.0, 280.0, 274.0, 269.0],
            years,
            0.05,
        ))
        .with_min_temperature(monthly(
            "tasmin",
            "air_temperature",
            "K",
            [263.0, 265.0, 269.0, 274.0, 279.0, 283.0, 285.0, 284.0, 280.0, 275.0, 269.0, 264.0],
            years,
            0.05,
        ))
        .with_max_temperature(monthly(
            "tasmax",
            "air_temperature",
            "K",
            [273.0, 275.0, 281.0, 286.0, 291.0, 295.0, 297.0, 296.0, 292.0, 285.0, 279.0, 274.0],
            years,
            0.05,
        ))
        .with_precipitation(monthly(
            "pr",
            "precipitation_flux",
            "kg m-2 s-1",
            [
                3.0e-5, 2.5e-5, 2.8e-5, 3.2e-5, 4.0e-5, 4.4e-5, 3.9e-5, 4.1e-5, 3.3e-5, 3.6e-5,
                3.8e-5, 3.4e-5,
            ],
            years,
            0.0,
        ))
        .with_wet_days(monthly(
            "wet",
            WET_DAYS_STANDARD_NAME,
            "days",
            [11.0, 10.0, 11.0, 12.0, 13.0, 12.0, 10.0, 10.0, 9.0, 10.0, 12.0, 11.0],
            years,
            0.0,
        ))
        .with_insolation(monthly(
            "rsds",
            "surface_downwelling_shortwave_flux_in_air",
            "W/m^2",
            [45.0, 75.0, 125.0, 175.0, 215.0, 240.0, 250.0, 215.0, 160.0, 105.0, 55.0, 38.0],
            years,
            0.0,
        ))
        .with_ndep_dry(monthly(
            "drynhx",
            "tendency_of_atmosphere_mass_content_of_nitrogen_compounds_due_to_dry_deposition",
            "gN m-2",
            [0.02; 12],
            years,
            0.0,
        ))
        .with_ndep_wet(monthly(
            "wetnhx",
            "tendency_of_atmosphere_mass_content_of_nitrogen_compounds_due_to_wet_deposition",
            "gN m-2",
            [0.05; 12],
            years,
            0.0,
        ))
        .with_co2(Co2Record::parse("1901 296.3\n1902 296.7\n1903 297.1\n1904 297.5").unwrap())
        .with_landforms(landforms());
    builder
}
