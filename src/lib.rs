//! Daily climate forcing for gridcell ecosystem simulations.
//!
//! Builds a complete daily forcing record for each gridcell (a spin-up period followed by
//! the historical record) from injected time-series sources, and downscales it to the
//! gridcell's landforms.
//!
//! The building blocks live in the member crates: `rscf_core` holds calendars, sources,
//! spin-up cycles and interpolation, `rscf_components` the precipitation, deposition and
//! landform components. This crate ties them together per gridcell.

pub mod batch;
pub mod checkpoint;
pub mod co2;
pub mod config;
pub mod forcing;

pub use batch::{run_batch, BatchReport};
pub use checkpoint::GridcellCheckpoint;
pub use co2::Co2Record;
pub use config::ForcingConfig;
pub use forcing::{DailyForcing, GridcellForcing, GridcellForcingBuilder, SharedSource};
pub use rscf_core::errors::{ForcingError, ForcingResult};
