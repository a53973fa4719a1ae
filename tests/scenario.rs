//! End-to-end forcing scenarios.

mod common;

use approx::assert_relative_eq;
use common::{daily, daily_from, monthly, monthly_gridcell};
use rscf::{Co2Record, DailyForcing, ForcingConfig, ForcingError, GridcellForcingBuilder};
use rscf_core::calendar::CalendarMode;
use rscf_core::timeseries::{FloatValue, SourceCalendar};

/// Thirty years of spin-up from a thirty year cycle, then the last five years of a
/// 35 year daily record.
mod daily_record {
    use super::*;

    const DAYS: usize = 365;

    fn run() -> (Vec<Vec<FloatValue>>, usize) {
        let config = ForcingConfig {
            spinup_years: 30,
            spinup_cycle_years: 30,
            detrend_spinup: false,
            ..Default::default()
        };
        let n = 35 * DAYS;
        let mut builder = GridcellForcingBuilder::new(config);
        builder
            .with_location(0.0, 52.0, 10.0)
            .with_temperature(daily(
                "tas",
                "air_temperature",
                "degC",
                (0..n).map(|i| i as FloatValue).collect(),
            ))
            .with_precipitation(daily("pr", "precipitation_amount", "mm", vec![2.0; n]))
            .with_insolation(daily(
                "rsds",
                "surface_downwelling_shortwave_flux",
                "W m-2",
                vec![150.0; n],
            ))
            .with_co2(Co2Record::constant(280.0).unwrap());

        let mut forcing = builder.build().unwrap();
        let mut years = vec![vec![]; 35];
        forcing
            .run_until(35, |daily| years[daily.day.simulated_year].push(daily.gridcell.temperature))
            .unwrap();

        let checkpoint = forcing.checkpoint().unwrap();
        (years, checkpoint.series[0].cursor.timestep)
    }

    #[test]
    fn spinup_repeats_the_start_of_the_record() {
        let (years, _) = run();
        // Years 5 and 35 (one based), day 10
        assert_eq!(years[4][9], years[34][9]);
        assert_eq!(years[4][9], (4 * DAYS + 9) as FloatValue);
        for year in 0..30 {
            assert_eq!(years[year][0], (year * DAYS) as FloatValue);
        }
    }

    #[test]
    fn historical_years_advance_one_step_per_day() {
        let (years, cursor) = run();
        let historical: Vec<FloatValue> = years[30..].iter().flatten().copied().collect();
        assert_eq!(historical.len(), 5 * DAYS);
        for (i, value) in historical.iter().enumerate() {
            assert_eq!(*value, i as FloatValue);
        }
        assert_eq!(cursor, 5 * DAYS);
    }
}

mod monthly_record {
    use super::*;

    fn run(years: usize) -> Vec<DailyForcing> {
        let config = ForcingConfig {
            spinup_years: 6,
            spinup_cycle_years: 3,
            ..Default::default()
        };
        let mut forcing = monthly_gridcell(config, 47.0).build().unwrap();
        let mut days = vec![];
        forcing.run_until(years, |daily| days.push(daily.clone())).unwrap();
        days
    }

    #[test]
    fn precipitation_totals_are_conserved() {
        let days = run(8);
        // July of the first historical year: 3.9e-5 kg m-2 s-1 over 31 days
        let july: FloatValue = days
            .iter()
            .filter(|d| d.day.simulated_year == 6 && d.day.month == 6)
            .map(|d| d.gridcell.precipitation)
            .sum();
        assert_relative_eq!(july, 3.9e-5 * 86400.0 * 31.0, epsilon = 1e-6);
        assert!(days.iter().all(|d| d.gridcell.precipitation >= 0.0));
    }

    #[test]
    fn optional_capabilities_are_present() {
        let days = run(1);
        for day in &days {
            let dtr = day.gridcell.diurnal_temperature_range().unwrap();
            assert!(dtr >= 0.0);
            assert!(day.gridcell.ndep > 0.0);
            for local in &day.landforms {
                assert_relative_eq!(local.climate.dtr.unwrap(), dtr);
                assert_eq!(local.climate.ndep, day.gridcell.ndep);
                assert_eq!(local.climate.precipitation, day.gridcell.precipitation);
            }
        }
        let total_ndep: FloatValue = days.iter().map(|d| d.gridcell.ndep).sum();
        assert_relative_eq!(total_ndep, 12.0 * 0.07 * 1.0e-3, epsilon = 1e-12);
    }

    #[test]
    fn co2_follows_calendar_year() {
        let days = run(11);
        let co2 = |year: usize| {
            days.iter()
                .find(|d| d.day.simulated_year == year)
                .unwrap()
                .gridcell
                .co2
        };
        assert_eq!(co2(0), 296.3);
        assert_eq!(co2(7), 296.7);
        assert_eq!(co2(10), 297.5);
    }

    #[test]
    fn reference_landform_matches_gridcell() {
        for day in run(2) {
            assert_eq!(day.landforms[0].landform, 0);
            assert_eq!(day.landforms[0].climate, day.gridcell);
        }
    }

    #[test]
    fn insolation_is_never_negative() {
        for latitude in [-70.0, -33.0, 0.0, 23.0, 47.0, 66.0, 80.0] {
            let config = ForcingConfig {
                spinup_years: 3,
                spinup_cycle_years: 3,
                ..Default::default()
            };
            let mut forcing = monthly_gridcell(config, latitude).build().unwrap();
            forcing
                .run_until(2, |daily| {
                    assert!(daily.gridcell.insolation >= 0.0);
                    assert!(daily.landforms.iter().all(|l| l.climate.insolation >= 0.0));
                })
                .unwrap();
        }
    }
}

/// A standard-calendar daily record covering the 1904 leap year.
mod leap_years {
    use super::*;

    /// 1903 to 1905; temperature equals the timestep index
    const RECORD_DAYS: usize = 365 + 366 + 365;

    fn run(mode: CalendarMode) -> Vec<Vec<FloatValue>> {
        let config = ForcingConfig {
            spinup_years: 1,
            spinup_cycle_years: 1,
            calendar: mode,
            detrend_spinup: false,
            ..Default::default()
        };
        let source = |name: &str, standard_name: &str, units: &str, values: Vec<FloatValue>| {
            daily_from(SourceCalendar::Standard, 1903, name, standard_name, units, values)
        };
        let mut builder = GridcellForcingBuilder::new(config);
        builder
            .with_location(0.0, 40.0, 0.0)
            .with_temperature(source(
                "tas",
                "air_temperature",
                "degC",
                (0..RECORD_DAYS).map(|i| i as FloatValue).collect(),
            ))
            .with_precipitation(source(
                "pr",
                "precipitation_amount",
                "mm",
                vec![1.0; RECORD_DAYS],
            ))
            .with_insolation(source(
                "rsds",
                "surface_downwelling_shortwave_flux",
                "W m-2",
                vec![200.0; RECORD_DAYS],
            ))
            .with_co2(Co2Record::constant(300.0).unwrap());

        let mut forcing = builder.build().unwrap();
        let mut years = vec![vec![]; 4];
        forcing
            .run_until(4, |daily| {
                years[daily.day.simulated_year].push(daily.gridcell.temperature)
            })
            .unwrap();
        years
    }

    #[test]
    fn gregorian_run_follows_the_record_through_leap_day() {
        let years = run(CalendarMode::Gregorian);
        let lengths: Vec<usize> = years.iter().map(|y| y.len()).collect();
        assert_eq!(lengths, vec![365, 365, 366, 365]);

        // 29 February 1904
        assert_eq!(years[2][59], (365 + 59) as FloatValue);
        let historical: Vec<FloatValue> = years[1..].iter().flatten().copied().collect();
        assert_eq!(historical.len(), RECORD_DAYS);
        for (i, value) in historical.iter().enumerate() {
            assert_eq!(*value, i as FloatValue);
        }
    }

    #[test]
    fn noleap_run_skips_the_record_leap_day() {
        let years = run(CalendarMode::NoLeap);
        assert!(years.iter().all(|y| y.len() == 365));

        // 28 February and 1 March 1904
        assert_eq!(years[2][58], (365 + 58) as FloatValue);
        assert_eq!(years[2][59], (365 + 60) as FloatValue);
        assert_eq!(*years[3].last().unwrap(), (RECORD_DAYS - 1) as FloatValue);
    }
}

mod setup_errors {
    use super::*;

    #[test]
    fn records_must_cover_the_same_years() {
        let config = ForcingConfig {
            spinup_years: 3,
            spinup_cycle_years: 3,
            ..Default::default()
        };
        let mut builder = monthly_gridcell(config, 47.0);
        builder.with_precipitation(monthly(
            "pr",
            "precipitation_flux",
            "kg m-2 s-1",
            [3.0e-5; 12],
            3,
            0.0,
        ));
        assert!(matches!(
            builder.build(),
            Err(ForcingError::IncompatibleSources { .. })
        ));
    }
}
