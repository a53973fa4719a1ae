//! Parallel processing of independent gridcells.
//!
//! Each gridcell is set up and run to completion on a single rayon task. Gridcells share no
//! mutable state, so results do not depend on how they are spread over threads.
//!
//! - a setup error ends only its own gridcell and is recorded in the [`BatchReport`]
//! - an error while running (an invariant violation) aborts the whole batch
//! - the stop flag is checked before each gridcell starts; running gridcells finish

use crate::forcing::{DailyForcing, GridcellForcingBuilder};
use log::{error, info, warn};
use rayon::prelude::*;
use rscf_core::errors::{ForcingError, ForcingResult};
use std::sync::atomic::{AtomicBool, Ordering};

/// What happened to each gridcell of a batch, by index into the jobs
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<usize>,
    pub failed: Vec<(usize, ForcingError)>,
    pub skipped: Vec<usize>,
}

enum Outcome {
    Completed,
    SetupFailed(ForcingError),
    Skipped,
    Aborted(ForcingError),
}

/// Run `years` simulated years for every gridcell in `jobs`.
///
/// `consumer` receives the gridcell index and each day's forcing. It is called from worker
/// threads, in day order within a gridcell.
pub fn run_batch<F>(
    jobs: &[GridcellForcingBuilder],
    years: usize,
    stop: &AtomicBool,
    consumer: F,
) -> ForcingResult<BatchReport>
where
    F: Fn(usize, &DailyForcing) + Sync,
{
    info!("Running {} gridcells for {} years", jobs.len(), years);

    let outcomes: Vec<Outcome> = jobs
        .par_iter()
        .enumerate()
        .map(|(index, job)| {
            if stop.load(Ordering::Relaxed) {
                return Outcome::Skipped;
            }
            let mut forcing = match job.build() {
                Ok(forcing) => forcing,
                Err(e) => {
                    warn!("Gridcell {index} failed during setup: {e}");
                    return Outcome::SetupFailed(e);
                }
            };
            match forcing.run_until(years, |daily| consumer(index, daily)) {
                Ok(()) => Outcome::Completed,
                Err(e) => {
                    error!("Gridcell {index} aborted the run: {e}");
                    stop.store(true, Ordering::Relaxed);
                    Outcome::Aborted(e)
                }
            }
        })
        .collect();

    let mut report = BatchReport::default();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::Completed => report.completed.push(index),
            Outcome::SetupFailed(e) => report.failed.push((index, e)),
            Outcome::Skipped => report.skipped.push(index),
            Outcome::Aborted(e) => return Err(e),
        }
    }
    info!(
        "Batch finished: {} completed, {} failed, {} skipped",
        report.completed.len(),
        report.failed.len(),
        report.skipped.len()
    );
    Ok(report)
}
