//! Spin-up climate synthesis.
//!
//! Before the historical record starts, a gridcell is driven by a repeating cycle built from
//! the first years of that record. A [`SpinupCycle`] stores those years as a
//! `years x slots` array: 12 slots for monthly sources, 365 for daily sources (the 29th of
//! February is dropped so every cycle year has the same shape).
//!
//! Cycling wraps without a seam: cycle year `k` is always identical to cycle year
//! `k mod num_years`.
//!
//! # Detrending
//!
//! A record with a warming trend would make the cycle jump back at every wrap. Detrending
//! fits a line through the annual means and removes the slope, anchored on the first year:
//!
//! $$x'_{y,d} = x_{y,d} - b\,y, \qquad b = \frac{\sum_y (y - \bar y)(\bar x_y - \bar{\bar x})}{\sum_y (y - \bar y)^2}$$
//!
//! so the cycle keeps the level of the start of the record, where the historical period
//! picks up.

use crate::calendar::{month_lengths, DAYS_PER_NOLEAP_YEAR, MONTHS_PER_YEAR};
use crate::errors::{ForcingError, ForcingResult};
use crate::timeseries::{FloatValue, Resolution, SourceCalendar, SourceDate, TimeSeriesSource};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Slot of a date within a year without a leap day.
///
/// Returns `None` for the 29th of February.
pub fn noleap_slot(date: &SourceDate) -> Option<usize> {
    if date.is_leap_day() {
        return None;
    }
    let lengths = month_lengths(false);
    Some(lengths[..date.month].iter().sum::<usize>() + date.day)
}

/// A repeating multi-year cycle of one variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpinupCycle {
    resolution: Resolution,
    data: Array2<FloatValue>,
    position: usize,
}

impl SpinupCycle {
    /// Build a cycle from the first `num_years` years of `source`, using raw source values.
    pub fn build(source: &dyn TimeSeriesSource, num_years: usize) -> ForcingResult<Self> {
        Self::build_with(source, num_years, |index| source.value(index))
    }

    /// Build a cycle from the first `num_years` years of `source`.
    ///
    /// `value_of` maps a timestep index to the value stored in the cycle, which lets the
    /// caller convert units on the way in.
    ///
    /// The source must start on the first of January (daily) or in January (monthly) and
    /// hold at least `num_years` complete, gap-free years. Anything less is
    /// `InsufficientSpinupData`.
    pub fn build_with<F>(
        source: &dyn TimeSeriesSource,
        num_years: usize,
        value_of: F,
    ) -> ForcingResult<Self>
    where
        F: Fn(usize) -> FloatValue,
    {
        let resolution = source.resolution();
        let slots = match resolution {
            Resolution::Daily => DAYS_PER_NOLEAP_YEAR,
            Resolution::Monthly => MONTHS_PER_YEAR,
        };

        let insufficient = |available: usize| ForcingError::InsufficientSpinupData {
            variable: source.name().to_string(),
            required: num_years,
            available,
            resolution: resolution.to_string(),
        };

        if num_years == 0 || source.timesteps() == 0 {
            return Err(insufficient(0));
        }
        let first = source.date(0);
        if first.month != 0 || first.day != 0 {
            return Err(insufficient(0));
        }

        let calendar = source.calendar();
        let mut data = Array2::<FloatValue>::zeros((num_years, slots));
        let mut expected = first;
        let mut year = 0;
        let mut slot = 0;

        for index in 0..source.timesteps() {
            let date = source.date(index);
            if date != expected {
                break;
            }
            expected = match resolution {
                Resolution::Daily => calendar.next_day(date),
                Resolution::Monthly => SourceCalendar::next_month(date),
            };

            let target = match resolution {
                Resolution::Daily => noleap_slot(&date),
                Resolution::Monthly => Some(date.month),
            };
            let Some(target) = target else {
                continue;
            };
            debug_assert_eq!(target, slot);

            data[[year, slot]] = value_of(index);
            slot += 1;
            if slot == slots {
                slot = 0;
                year += 1;
                if year == num_years {
                    return Ok(Self {
                        resolution,
                        data,
                        position: 0,
                    });
                }
            }
        }

        Err(insufficient(year))
    }

    /// Build a cycle from an explicit `years x slots` array.
    pub fn from_array(resolution: Resolution, data: Array2<FloatValue>) -> ForcingResult<Self> {
        let expected = match resolution {
            Resolution::Daily => DAYS_PER_NOLEAP_YEAR,
            Resolution::Monthly => MONTHS_PER_YEAR,
        };
        if data.ncols() != expected || data.nrows() == 0 {
            return Err(ForcingError::Error(format!(
                "Spin-up array of shape {:?} does not hold whole {} years",
                data.shape(),
                resolution
            )));
        }
        Ok(Self {
            resolution,
            data,
            position: 0,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn num_years(&self) -> usize {
        self.data.nrows()
    }

    pub fn slots(&self) -> usize {
        self.data.ncols()
    }

    /// Position of the current year within the cycle
    pub fn position(&self) -> usize {
        self.position
    }

    /// Restore the cycle position, e.g. from a checkpoint
    pub fn set_position(&mut self, position: usize) -> ForcingResult<()> {
        if position >= self.num_years() {
            return Err(ForcingError::CheckpointMismatch(format!(
                "spin-up position {} outside a cycle of {} years",
                position,
                self.num_years()
            )));
        }
        self.position = position;
        Ok(())
    }

    /// Values of the current cycle year
    pub fn current(&self) -> ArrayView1<'_, FloatValue> {
        self.data.row(self.position)
    }

    /// Value of `slot` in the current cycle year
    pub fn value(&self, slot: usize) -> FloatValue {
        self.data[[self.position, slot]]
    }

    /// Values of cycle-relative year `year`, wrapping around the cycle
    pub fn year(&self, year: usize) -> ArrayView1<'_, FloatValue> {
        self.data.row(year % self.num_years())
    }

    /// Advance to the next cycle year, wrapping after the last
    pub fn next_year(&mut self) {
        self.position = (self.position + 1) % self.num_years();
    }

    /// Mean over all years and slots
    pub fn mean(&self) -> FloatValue {
        self.data.mean().unwrap_or(0.0)
    }

    /// Remove the linear trend in annual means, anchored on the first cycle year.
    pub fn detrend(&mut self) {
        let n = self.num_years();
        if n < 2 {
            return;
        }
        let Some(annual_means) = self.data.mean_axis(Axis(1)) else {
            return;
        };

        let slope = regression_slope(&annual_means.to_vec());
        for (year, mut row) in self.data.axis_iter_mut(Axis(0)).enumerate() {
            let anomaly = slope * year as FloatValue;
            row.mapv_inplace(|v| v - anomaly);
        }
    }
}

/// Least-squares slope of `values` against their index.
fn regression_slope(values: &[FloatValue]) -> FloatValue {
    let n = values.len() as FloatValue;
    if values.len() < 2 {
        return 0.0;
    }
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<FloatValue>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as FloatValue - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    sxy / sxx
}
