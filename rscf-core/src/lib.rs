//! Core primitives for building daily gridcell climate forcing.
//!
//! Readers expose their data through [`timeseries::TimeSeriesSource`]. Everything else in this
//! crate turns those sources into yearly arrays of values on the simulation's calendar.

pub mod calendar;
pub mod errors;
pub mod interpolate;
pub mod selector;
pub mod spinup;
pub mod standard_variables;
pub mod timeseries;
pub mod units;
