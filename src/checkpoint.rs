//! Resumable gridcell state.
//!
//! A checkpoint holds what cannot be rebuilt from the inputs: where each variable is in its
//! historical record and spin-up cycle, the precipitation seed, the simulated year and the
//! landforms. Restoring it with [`GridcellForcingBuilder::restore`] gives forcing identical
//! to an uninterrupted run.
//!
//! The checkpoint is a plain serde value; how it is stored is up to the caller.
//!
//! Checkpoints are taken at year boundaries only. The yearly rebuild is the unit of work a
//! gridcell resumes from, so the per-year arrays are never stored.
//!
//! [`GridcellForcingBuilder::restore`]: crate::forcing::GridcellForcingBuilder::restore

use rscf_components::components::Landforms;
use rscf_core::calendar::CalendarAlignment;
use rscf_core::selector::HistoricalCursor;
use serde::{Deserialize, Serialize};

/// Position of one variable
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesState {
    pub cursor: HistoricalCursor,
    pub spinup_position: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridcellCheckpoint {
    /// First simulated year that has not been produced yet
    pub simulated_year: usize,
    /// Seed of the precipitation generator
    pub seed: u64,
    pub alignment: CalendarAlignment,
    /// Variables in the order the gridcell reads them
    pub series: Vec<SeriesState>,
    pub landforms: Landforms,
}
