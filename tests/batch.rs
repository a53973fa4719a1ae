//! Parallel batches of independent gridcells.

mod common;

use common::{daily, monthly_gridcell};
use rscf::{run_batch, BatchReport, Co2Record, ForcingConfig, GridcellForcingBuilder};
use rscf_core::timeseries::FloatValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

fn config() -> ForcingConfig {
    ForcingConfig {
        spinup_years: 3,
        spinup_cycle_years: 3,
        ..Default::default()
    }
}

fn jobs() -> Vec<GridcellForcingBuilder> {
    [-35.0, 12.0, 47.0, 61.0]
        .into_iter()
        .map(|latitude| monthly_gridcell(config(), latitude))
        .collect()
}

/// Sum of landform insolation and gridcell precipitation per gridcell
fn run(jobs: &[GridcellForcingBuilder]) -> (BatchReport, Vec<(usize, FloatValue, FloatValue)>) {
    let stop = AtomicBool::new(false);
    let totals = Mutex::new(vec![(0, 0.0, 0.0); jobs.len()]);
    let report = run_batch(jobs, 4, &stop, |index, daily| {
        let mut totals = totals.lock().unwrap();
        let entry = &mut totals[index];
        entry.0 += 1;
        entry.1 += daily.landforms.iter().map(|l| l.climate.insolation).sum::<FloatValue>();
        entry.2 += daily.gridcell.precipitation;
    })
    .unwrap();
    (report, totals.into_inner().unwrap())
}

#[test]
fn results_match_sequential_runs() {
    let jobs = jobs();
    let (report, totals) = run(&jobs);
    assert_eq!(report.completed, vec![0, 1, 2, 3]);
    assert!(report.failed.is_empty());

    for (index, job) in jobs.iter().enumerate() {
        let mut forcing = job.build().unwrap();
        let mut expected = (0, 0.0, 0.0);
        forcing
            .run_until(4, |daily| {
                expected.0 += 1;
                expected.1 += daily
                    .landforms
                    .iter()
                    .map(|l| l.climate.insolation)
                    .sum::<FloatValue>();
                expected.2 += daily.gridcell.precipitation;
            })
            .unwrap();
        assert_eq!(totals[index], expected);
        assert_eq!(totals[index].0, 4 * 365);
    }
}

#[test]
fn setup_failure_only_affects_its_gridcell() {
    let mut jobs = jobs();
    let mut broken = GridcellForcingBuilder::new(config());
    broken.with_location(0.0, 0.0, 0.0);
    jobs.insert(1, broken);

    let (report, totals) = run(&jobs);
    assert_eq!(report.completed, vec![0, 2, 3, 4]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, 1);
    assert!(!report.failed[0].1.is_fatal_for_run());
    assert_eq!(totals[1].0, 0);
}

#[test]
fn invariant_violation_aborts_the_batch() {
    let mut jobs = jobs();
    let n = 5 * 365;
    let mut negative = GridcellForcingBuilder::new(config());
    negative
        .with_location(0.0, 10.0, 0.0)
        .with_temperature(daily("tas", "air_temperature", "degC", vec![15.0; n]))
        .with_precipitation(daily("pr", "precipitation_amount", "mm", vec![1.0; n]))
        .with_insolation(daily(
            "rsds",
            "surface_downwelling_shortwave_flux",
            "W m-2",
            vec![-5.0; n],
        ))
        .with_co2(Co2Record::constant(300.0).unwrap());
    jobs.push(negative);

    let stop = AtomicBool::new(false);
    let err = run_batch(&jobs, 2, &stop, |_, _| {}).unwrap_err();
    assert!(err.is_fatal_for_run());
    assert!(stop.load(Ordering::Relaxed));
}

#[test]
fn stop_flag_skips_remaining_gridcells() {
    let jobs = jobs();
    let stop = AtomicBool::new(true);
    let report = run_batch(&jobs, 2, &stop, |_, _| panic!("no gridcell should run")).unwrap();
    assert_eq!(report.skipped, vec![0, 1, 2, 3]);
    assert!(report.completed.is_empty());
}
