//! Historic/spin-up selection of yearly forcing values.
//!
//! A [`ForcingSeries`] owns everything one variable needs to produce a year of values:
//! the injected source, its unit conversion, its spin-up cycle and a [`HistoricalCursor`].
//!
//! For every unit of time (day or month) of the simulated year:
//!
//! - if the date, expressed in the source's native years, is earlier than the source's first
//!   timestep, the value comes from the spin-up cycle;
//! - otherwise the value comes from the source at the cursor, and the cursor advances by
//!   one step.
//!
//! Two leap-day mismatches are reconciled on daily sources:
//!
//! - the source has a 29th of February that the simulated year lacks: the source step is
//!   skipped;
//! - the simulated year has a 29th of February the source lacks: the cursor stays put and
//!   the previous value is repeated.
//!
//! Once the cursor is past the end of the source every remaining unit of time repeats the
//! last value read.

use crate::calendar::{CalendarAlignment, YearLayout, MONTHS_PER_YEAR};
use crate::errors::{ForcingError, ForcingResult};
use crate::interpolate::YearlyValues;
use crate::spinup::SpinupCycle;
use crate::standard_variables::VariableDefinition;
use crate::timeseries::{FloatValue, Resolution, SourceDate, TimeSeriesSource};
use crate::units::{validate_source, ForcingUnit};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Position of a variable within its historical record.
///
/// The timestep never decreases. `last_value` is the most recent value read from the
/// record, in model units, and is what gets repeated once the record runs out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalCursor {
    pub variable: String,
    pub timestep: usize,
    pub last_value: Option<FloatValue>,
}

impl HistoricalCursor {
    pub fn new(variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
            timestep: 0,
            last_value: None,
        }
    }
}

/// Value of source timestep `index` in model units.
fn model_value(
    source: &dyn TimeSeriesSource,
    unit: &ForcingUnit,
    resolution: Resolution,
    index: usize,
) -> FloatValue {
    let period_days = match resolution {
        Resolution::Daily => 1,
        Resolution::Monthly => {
            let date = source.date(index);
            source.calendar().days_in_month(date.year, date.month)
        }
    };
    unit.to_model_units(source.value(index), period_days)
}

/// One forcing variable of one gridcell.
#[derive(Debug)]
pub struct ForcingSeries {
    definition: VariableDefinition,
    source: Arc<dyn TimeSeriesSource>,
    unit: ForcingUnit,
    resolution: Resolution,
    first_date: SourceDate,
    spinup: SpinupCycle,
    cursor: HistoricalCursor,
}

impl ForcingSeries {
    /// Validate `source` against `definition` and build its spin-up cycle.
    ///
    /// # Arguments
    ///
    /// * `definition` - The variable the source provides
    /// * `source` - The injected source
    /// * `spinup_cycle_years` - Number of years at the start of the record the cycle is built from
    /// * `detrend` - Whether to remove the linear trend from the cycle
    pub fn new(
        definition: &VariableDefinition,
        source: Arc<dyn TimeSeriesSource>,
        spinup_cycle_years: usize,
        detrend: bool,
    ) -> ForcingResult<Self> {
        let unit = validate_source(source.as_ref(), definition)?;
        if source.timesteps() == 0 {
            return Err(ForcingError::InsufficientSpinupData {
                variable: definition.name.to_string(),
                required: spinup_cycle_years,
                available: 0,
                resolution: "any".to_string(),
            });
        }
        let resolution = source.resolution();
        let mut spinup = SpinupCycle::build_with(source.as_ref(), spinup_cycle_years, |index| {
            model_value(source.as_ref(), &unit, resolution, index)
        })?;
        if detrend {
            spinup.detrend();
        }

        let first_date = source.date(0);
        info!(
            "{}: {} source '{}' ({}), {} timesteps from {}, {} year spin-up cycle",
            definition.name,
            resolution,
            source.name(),
            source.units(),
            source.timesteps(),
            first_date,
            spinup_cycle_years
        );

        Ok(Self {
            definition: *definition,
            cursor: HistoricalCursor::new(definition.name),
            source,
            unit,
            resolution,
            first_date,
            spinup,
        })
    }

    pub fn definition(&self) -> &VariableDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name
    }

    pub fn source(&self) -> &dyn TimeSeriesSource {
        self.source.as_ref()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn first_date(&self) -> SourceDate {
        self.first_date
    }

    pub fn cursor(&self) -> &HistoricalCursor {
        &self.cursor
    }

    pub fn spinup(&self) -> &SpinupCycle {
        &self.spinup
    }

    /// Whether the cursor has run past the end of the record
    pub fn is_exhausted(&self) -> bool {
        self.cursor.timestep >= self.source.timesteps()
    }

    /// Restore cursor and spin-up position, e.g. from a checkpoint.
    pub fn restore(
        &mut self,
        cursor: &HistoricalCursor,
        spinup_position: usize,
    ) -> ForcingResult<()> {
        if cursor.variable != self.definition.name {
            return Err(ForcingError::CheckpointMismatch(format!(
                "cursor for {} applied to {}",
                cursor.variable, self.definition.name
            )));
        }
        if cursor.timestep > self.source.timesteps() {
            return Err(ForcingError::CheckpointMismatch(format!(
                "cursor {} beyond the {} timesteps of {}",
                cursor.timestep,
                self.source.timesteps(),
                self.definition.name
            )));
        }
        self.spinup.set_position(spinup_position)?;
        self.cursor = cursor.clone();
        Ok(())
    }

    /// Values for the simulated year described by `layout`.
    ///
    /// Monthly sources yield 12 values, daily sources one value per day of `layout`.
    /// Advances the cursor and, if any spin-up value was used, the spin-up cycle.
    pub fn yearly_data(
        &mut self,
        layout: &YearLayout,
        alignment: &CalendarAlignment,
    ) -> YearlyValues {
        let native_year = alignment.to_native_year(layout.calendar_year);
        let mut used_spinup = false;

        let values = match self.resolution {
            Resolution::Monthly => {
                let mut monthly = [0.0; MONTHS_PER_YEAR];
                for (month, value) in monthly.iter_mut().enumerate() {
                    if SourceDate::new(native_year, month, 0) < self.first_date {
                        used_spinup = true;
                        *value = self.spinup.value(month);
                    } else {
                        *value = self.next_historical(false);
                    }
                }
                YearlyValues::Monthly(monthly)
            }
            Resolution::Daily => {
                let mut daily = Vec::with_capacity(layout.len());
                for day in 0..layout.len() {
                    let (month, day_of_month) = layout.month_and_day(day);
                    let date = SourceDate::new(native_year, month, day_of_month);
                    if date < self.first_date {
                        used_spinup = true;
                        daily.push(self.spinup.value(layout.noleap_slot(day)));
                    } else {
                        daily.push(self.next_historical(date.is_leap_day()));
                    }
                }
                YearlyValues::Daily(daily)
            }
        };

        if used_spinup {
            self.spinup.next_year();
        }
        values
    }

    /// Next historical value, applying the leap-day corrections on daily sources.
    fn next_historical(&mut self, simulated_leap_day: bool) -> FloatValue {
        let n = self.source.timesteps();

        if self.resolution == Resolution::Daily {
            if !simulated_leap_day
                && self.cursor.timestep < n
                && self.source.date(self.cursor.timestep).is_leap_day()
            {
                self.cursor.timestep += 1;
            }
            if self.cursor.timestep < n
                && simulated_leap_day
                && !self.source.date(self.cursor.timestep).is_leap_day()
            {
                return self.repeat_last();
            }
        }

        if self.cursor.timestep >= n {
            return self.repeat_last();
        }

        let value = model_value(
            self.source.as_ref(),
            &self.unit,
            self.resolution,
            self.cursor.timestep,
        );
        self.cursor.timestep += 1;
        self.cursor.last_value = Some(value);
        if self.cursor.timestep == n {
            warn!(
                "{}: historical record exhausted after {}; holding the last value",
                self.definition.name,
                self.source.date(n - 1)
            );
        }
        value
    }

    fn repeat_last(&self) -> FloatValue {
        match self.cursor.last_value {
            Some(value) => value,
            None => {
                let index = self.cursor.timestep.min(self.source.timesteps() - 1);
                model_value(self.source.as_ref(), &self.unit, self.resolution, index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarMode;
    use crate::standard_variables::{VAR_PRECIPITATION, VAR_TEMPERATURE};
    use crate::timeseries::{InMemorySource, SourceCalendar};

    fn daily_temperature(
        calendar: SourceCalendar,
        first_year: i32,
        n: usize,
    ) -> Arc<dyn TimeSeriesSource> {
        Arc::new(InMemorySource::daily(
            "tas",
            "air_temperature",
            "degC",
            calendar,
            first_year,
            (0..n).map(|i| i as FloatValue).collect(),
        ))
    }

    fn daily(values: YearlyValues) -> Vec<FloatValue> {
        match values {
            YearlyValues::Daily(v) => v,
            YearlyValues::Monthly(_) => panic!("expected daily values"),
        }
    }

    fn year_of(
        series: &mut ForcingSeries,
        mode: CalendarMode,
        calendar_year: i32,
        alignment: &CalendarAlignment,
    ) -> Vec<FloatValue> {
        daily(series.yearly_data(&YearLayout::new(mode, calendar_year), alignment))
    }

    #[test]
    fn spinup_years_come_from_cycle() {
        let source = daily_temperature(SourceCalendar::NoLeap, 1901, 3 * 365);
        let mut series = ForcingSeries::new(&VAR_TEMPERATURE, source, 2, false).unwrap();
        let alignment = CalendarAlignment::new(1901, 0);

        // Three spin-up years: cycle years 0, 1, 0
        let y0 = year_of(&mut series, CalendarMode::NoLeap, 1898, &alignment);
        let y1 = year_of(&mut series, CalendarMode::NoLeap, 1899, &alignment);
        let y2 = year_of(&mut series, CalendarMode::NoLeap, 1900, &alignment);
        assert_eq!(y0, y2);
        assert_eq!(y1[0], 365.0);
        assert_eq!(series.cursor().timestep, 0);

        // First historical year reads the record from its start
        let y3 = year_of(&mut series, CalendarMode::NoLeap, 1901, &alignment);
        assert_eq!(y3[0], 0.0);
        assert_eq!(y3[364], 364.0);
        assert_eq!(series.cursor().timestep, 365);
    }

    #[test]
    fn exhausted_record_holds_last_value() {
        let source = daily_temperature(SourceCalendar::NoLeap, 1901, 365 + 100);
        let mut series = ForcingSeries::new(&VAR_TEMPERATURE, source, 1, false).unwrap();
        let alignment = CalendarAlignment::new(1901, 0);
        series.yearly_data(&YearLayout::new(CalendarMode::NoLeap, 1901), &alignment);
        let year = year_of(&mut series, CalendarMode::NoLeap, 1902, &alignment);
        assert_eq!(year[99], 464.0);
        assert!(year[100..].iter().all(|v| *v == 464.0));
        assert!(series.is_exhausted());

        let next = year_of(&mut series, CalendarMode::NoLeap, 1903, &alignment);
        assert!(next.iter().all(|v| *v == 464.0));
        assert_eq!(series.cursor().timestep, 465);
    }

    #[test]
    fn source_leap_day_skipped_in_noleap_simulation() {
        // 1904 is a leap year in the source
        let source = daily_temperature(SourceCalendar::Standard, 1904, 2 * 366);
        let mut series = ForcingSeries::new(&VAR_TEMPERATURE, source, 1, false).unwrap();
        let alignment = CalendarAlignment::new(1904, 0);
        let year = year_of(&mut series, CalendarMode::NoLeap, 1904, &alignment);
        assert_eq!(year.len(), 365);
        assert_eq!(year[58], 58.0);
        assert_eq!(year[59], 60.0);
        assert_eq!(series.cursor().timestep, 366);
    }

    #[test]
    fn simulated_leap_day_repeats_without_advancing() {
        let source = daily_temperature(SourceCalendar::NoLeap, 1904, 2 * 365);
        let mut series = ForcingSeries::new(&VAR_TEMPERATURE, source, 1, false).unwrap();
        let alignment = CalendarAlignment::new(1904, 0);
        let year = year_of(&mut series, CalendarMode::Gregorian, 1904, &alignment);
        assert_eq!(year.len(), 366);
        assert_eq!(year[58], 58.0);
        assert_eq!(year[59], 58.0);
        assert_eq!(year[60], 59.0);
        assert_eq!(series.cursor().timestep, 365);
    }

    #[test]
    fn paleo_offset_shifts_record() {
        let source = Arc::new(
            InMemorySource::monthly(
                "pr",
                "precipitation_amount",
                "mm",
                SourceCalendar::NoLeap,
                1,
                (0..24).map(|i| i as FloatValue).collect(),
            )
            .with_paleo_offset(-21000),
        );
        let mut series = ForcingSeries::new(&VAR_PRECIPITATION, source, 1, false).unwrap();
        let alignment = CalendarAlignment::from_first_timestep(1, -21000);

        let spin = series.yearly_data(&YearLayout::new(CalendarMode::NoLeap, -21000), &alignment);
        assert_eq!(spin.as_monthly().unwrap()[3], 3.0);
        let hist = series.yearly_data(&YearLayout::new(CalendarMode::NoLeap, -20999), &alignment);
        assert_eq!(hist.as_monthly().unwrap()[0], 0.0);
        let hist = series.yearly_data(&YearLayout::new(CalendarMode::NoLeap, -20998), &alignment);
        assert_eq!(hist.as_monthly().unwrap()[11], 23.0);
    }

    #[test]
    fn monthly_rates_are_integrated() {
        let source = Arc::new(InMemorySource::monthly(
            "pr",
            "precipitation_flux",
            "mm/day",
            SourceCalendar::NoLeap,
            1901,
            vec![2.0; 12],
        ));
        let mut series = ForcingSeries::new(&VAR_PRECIPITATION, source, 1, false).unwrap();
        let values = series.yearly_data(
            &YearLayout::new(CalendarMode::NoLeap, 1901),
            &CalendarAlignment::new(1901, 0),
        );
        let monthly = values.as_monthly().unwrap();
        assert_eq!(monthly[0], 62.0);
        assert_eq!(monthly[1], 56.0);
    }

    #[test]
    fn cursor_serialization() {
        let cursor = HistoricalCursor {
            variable: "Temperature".to_string(),
            timestep: 1234,
            last_value: Some(-3.5),
        };
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, r#"{"variable":"Temperature","timestep":1234,"last_value":-3.5}"#);
        let restored: HistoricalCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cursor);
    }

    #[test]
    fn restore_rejects_foreign_cursor() {
        let source = daily_temperature(SourceCalendar::NoLeap, 1901, 365);
        let mut series = ForcingSeries::new(&VAR_TEMPERATURE, source, 1, false).unwrap();
        let mut cursor = HistoricalCursor::new("Precipitation");
        assert!(series.restore(&cursor, 0).is_err());
        cursor.variable = "Temperature".to_string();
        cursor.timestep = 400;
        assert!(series.restore(&cursor, 0).is_err());
        cursor.timestep = 100;
        cursor.last_value = Some(99.0);
        series.restore(&cursor, 0).unwrap();
        assert_eq!(series.cursor().timestep, 100);
    }
}
