//! Resuming a gridcell from a checkpoint must reproduce an uninterrupted run.

mod common;

use common::{landforms, monthly_gridcell};
use rscf::{DailyForcing, ForcingConfig, ForcingError, GridcellCheckpoint};

fn config() -> ForcingConfig {
    ForcingConfig {
        spinup_years: 6,
        spinup_cycle_years: 3,
        initial_seed: 2024,
        ..Default::default()
    }
}

fn collect(years: usize, forcing: &mut rscf::GridcellForcing) -> Vec<DailyForcing> {
    let mut days = vec![];
    forcing.run_until(years, |daily| days.push(daily.clone())).unwrap();
    days
}

#[test]
fn restored_run_matches_uninterrupted_run() {
    let builder = monthly_gridcell(config(), 47.0);
    let mut uninterrupted = builder.build().unwrap();
    let expected = collect(13, &mut uninterrupted);

    // Stop in the middle of the spin-up, and again after the record has run out
    for stop_year in [4, 11] {
        let mut first = builder.build().unwrap();
        collect(stop_year, &mut first);
        let checkpoint = first.checkpoint().unwrap();
        assert_eq!(checkpoint.simulated_year, stop_year);

        let stored = serde_json::to_string(&checkpoint).unwrap();
        let checkpoint: GridcellCheckpoint = serde_json::from_str(&stored).unwrap();

        let mut resumed = builder.restore(&checkpoint).unwrap();
        assert_eq!(resumed.seed(), first.seed());
        let resumed_days = collect(13, &mut resumed);

        let offset = expected
            .iter()
            .position(|d| d.day.simulated_year == stop_year)
            .unwrap();
        assert_eq!(resumed_days.len(), expected.len() - offset);
        assert_eq!(resumed_days, expected[offset..]);
    }
}

#[test]
fn cursors_are_saved_per_variable() {
    let builder = monthly_gridcell(config(), 47.0);
    let mut forcing = builder.build().unwrap();
    collect(8, &mut forcing);
    let checkpoint = forcing.checkpoint().unwrap();

    // Temperature, precipitation, insolation, wet days, min/max temperature, dry/wet deposition
    assert_eq!(checkpoint.series.len(), 8);
    for state in &checkpoint.series {
        assert_eq!(state.cursor.timestep, 24, "{}", state.cursor.variable);
    }
}

#[test]
fn checkpoint_from_another_gridcell_is_rejected() {
    let builder = monthly_gridcell(config(), 47.0);
    let mut forcing = builder.build().unwrap();
    collect(2, &mut forcing);
    let checkpoint = forcing.checkpoint().unwrap();

    let mut other = monthly_gridcell(config(), 47.0);
    let mut records = landforms();
    records[1].elevation = 1500.0;
    other.with_landforms(records);
    assert!(matches!(
        other.restore(&checkpoint),
        Err(ForcingError::CheckpointMismatch(_))
    ));

    let mut truncated = checkpoint.clone();
    truncated.series.pop();
    assert!(matches!(
        builder.restore(&truncated),
        Err(ForcingError::CheckpointMismatch(_))
    ));
}
