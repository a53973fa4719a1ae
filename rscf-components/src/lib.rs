//! Forcing components for gridcell simulations
//!
//! Each component works on one gridcell and one simulated year (or day) at a time:
//!
//! - `PrecipitationGenerator`: monthly totals to daily precipitation, with or without
//!   wet-day counts
//! - `distribute_ndep`: monthly nitrogen deposition to daily deposition following the
//!   precipitation
//! - `Downscaler`: gridcell climate to the climate of each landform

pub mod components;
