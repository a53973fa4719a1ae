//! Calendar and date model for gridcell simulations.
//!
//! A simulation runs a number of spin-up years followed by the historical period. Each
//! simulated year is mapped to a *calendar year*:
//!
//! $$\text{calendar\_year} = \text{simulated\_year} - \text{spinup\_years} + \text{first\_historical\_year}$$
//!
//! so spin-up years land on a fabricated pre-historical range. A time-series source may use
//! its own (paleo) year numbering; [`CalendarAlignment`] converts between the two.
//!
//! The [`Calendar`] owns the only mutable date in a gridcell and exposes it as an explicit
//! [`SimulatedDay`] value. Nothing else advances time.
//!
//! ```rust
//! use rscf_core::calendar::{Calendar, CalendarAlignment, CalendarMode};
//!
//! let alignment = CalendarAlignment::new(1901, 0);
//! let mut calendar = Calendar::new(CalendarMode::NoLeap, alignment, 30);
//! assert_eq!(calendar.today().calendar_year, 1871);
//! assert!(calendar.is_within_spinup());
//!
//! for _ in 0..365 {
//!     calendar.advance_one_day();
//! }
//! assert_eq!(calendar.today().calendar_year, 1872);
//! assert_eq!(calendar.today().day_of_year, 0);
//! ```

use serde::{Deserialize, Serialize};

pub const MONTHS_PER_YEAR: usize = 12;
pub const DAYS_PER_NOLEAP_YEAR: usize = 365;
pub const MAX_DAYS_PER_YEAR: usize = 366;

/// Month index of February (zero based)
pub const FEBRUARY: usize = 1;

const MONTH_LENGTHS: [usize; MONTHS_PER_YEAR] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Gregorian leap-year rule.
pub fn is_gregorian_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Month lengths for a year with or without a 29th of February.
pub fn month_lengths(leap: bool) -> [usize; MONTHS_PER_YEAR] {
    let mut lengths = MONTH_LENGTHS;
    if leap {
        lengths[FEBRUARY] += 1;
    }
    lengths
}

/// How the simulated calendar treats leap days.
///
/// The mode is chosen once at model start and never changes mid-run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarMode {
    /// Every year has 365 days
    #[default]
    NoLeap,
    /// Years follow the Gregorian leap-year rule applied to the calendar year
    Gregorian,
}

impl CalendarMode {
    pub fn is_leap(&self, calendar_year: i32) -> bool {
        match self {
            CalendarMode::NoLeap => false,
            CalendarMode::Gregorian => is_gregorian_leap_year(calendar_year),
        }
    }
}

/// Month and day layout of one calendar year.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct YearLayout {
    pub calendar_year: i32,
    pub leap: bool,
    month_lengths: [usize; MONTHS_PER_YEAR],
    month_starts: [usize; MONTHS_PER_YEAR],
}

#[allow(clippy::len_without_is_empty)]
impl YearLayout {
    pub fn new(mode: CalendarMode, calendar_year: i32) -> Self {
        Self::with_leap(calendar_year, mode.is_leap(calendar_year))
    }

    pub fn with_leap(calendar_year: i32, leap: bool) -> Self {
        let month_lengths = month_lengths(leap);
        let mut month_starts = [0; MONTHS_PER_YEAR];
        for m in 1..MONTHS_PER_YEAR {
            month_starts[m] = month_starts[m - 1] + month_lengths[m - 1];
        }
        Self {
            calendar_year,
            leap,
            month_lengths,
            month_starts,
        }
    }

    /// Number of days in the year
    pub fn len(&self) -> usize {
        self.month_starts[MONTHS_PER_YEAR - 1] + self.month_lengths[MONTHS_PER_YEAR - 1]
    }

    pub fn month_lengths(&self) -> &[usize; MONTHS_PER_YEAR] {
        &self.month_lengths
    }

    pub fn days_in_month(&self, month: usize) -> usize {
        self.month_lengths[month]
    }

    /// Day of year of the first day of `month`
    pub fn month_start(&self, month: usize) -> usize {
        self.month_starts[month]
    }

    /// Range of day-of-year indices belonging to `month`
    pub fn month_days(&self, month: usize) -> std::ops::Range<usize> {
        self.month_starts[month]..self.month_starts[month] + self.month_lengths[month]
    }

    /// Month and day of month for a day of year.
    ///
    /// # Panics
    ///
    /// Panics if `day_of_year` is not within the year.
    pub fn month_and_day(&self, day_of_year: usize) -> (usize, usize) {
        assert!(
            day_of_year < self.len(),
            "Day {} outside a year of {} days",
            day_of_year,
            self.len()
        );
        let month = self
            .month_starts
            .iter()
            .rposition(|&start| start <= day_of_year)
            .unwrap_or(0);
        (month, day_of_year - self.month_starts[month])
    }

    /// Position of a day within a year that never has a leap day.
    ///
    /// The 29th of February shares the slot of the 28th.
    pub fn noleap_slot(&self, day_of_year: usize) -> usize {
        let feb29 = self.month_starts[FEBRUARY] + 28;
        if self.leap && day_of_year >= feb29 {
            day_of_year - 1
        } else {
            day_of_year
        }
    }
}

/// Mapping between simulated calendar years and a data source's native years.
///
/// $$\text{native\_year} = \text{calendar\_year} - \text{paleo\_offset}$$
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarAlignment {
    /// Calendar year of the first historical (non spin-up) year
    pub first_historical_year: i32,
    pub paleo_offset: i32,
}

impl CalendarAlignment {
    pub fn new(first_historical_year: i32, paleo_offset: i32) -> Self {
        Self {
            first_historical_year,
            paleo_offset,
        }
    }

    /// Alignment derived from the first timestep of the primary source.
    pub fn from_first_timestep(first_native_year: i32, paleo_offset: i32) -> Self {
        Self::new(first_native_year + paleo_offset, paleo_offset)
    }

    pub fn to_native_year(&self, calendar_year: i32) -> i32 {
        calendar_year - self.paleo_offset
    }

    pub fn to_calendar_year(&self, native_year: i32) -> i32 {
        native_year + self.paleo_offset
    }
}

/// A single simulated day.
///
/// Produced only by [`Calendar`]; every other component reads it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedDay {
    /// Years since the start of the simulation (zero based)
    pub simulated_year: usize,
    pub calendar_year: i32,
    /// Zero based month
    pub month: usize,
    /// Zero based day of month
    pub day_of_month: usize,
    /// Zero based day of year
    pub day_of_year: usize,
    pub year_length: usize,
    pub is_last_day_of_month: bool,
    pub is_last_day_of_year: bool,
}

impl SimulatedDay {
    pub fn is_first_day_of_year(&self) -> bool {
        self.day_of_year == 0
    }

    pub fn is_leap_day(&self) -> bool {
        self.month == FEBRUARY && self.day_of_month == 28
    }
}

/// The calendar of one gridcell.
#[derive(Clone, Debug)]
pub struct Calendar {
    mode: CalendarMode,
    alignment: CalendarAlignment,
    spinup_years: usize,
    simulated_year: usize,
    day_of_year: usize,
    layout: YearLayout,
}

impl Calendar {
    pub fn new(mode: CalendarMode, alignment: CalendarAlignment, spinup_years: usize) -> Self {
        Self::at_year(mode, alignment, spinup_years, 0)
    }

    /// Calendar positioned on the first day of `simulated_year`
    pub fn at_year(
        mode: CalendarMode,
        alignment: CalendarAlignment,
        spinup_years: usize,
        simulated_year: usize,
    ) -> Self {
        let calendar_year = Self::year_for(&alignment, spinup_years, simulated_year);
        Self {
            mode,
            alignment,
            spinup_years,
            simulated_year,
            day_of_year: 0,
            layout: YearLayout::new(mode, calendar_year),
        }
    }

    fn year_for(alignment: &CalendarAlignment, spinup_years: usize, simulated_year: usize) -> i32 {
        alignment.first_historical_year + simulated_year as i32 - spinup_years as i32
    }

    pub fn mode(&self) -> CalendarMode {
        self.mode
    }

    pub fn alignment(&self) -> &CalendarAlignment {
        &self.alignment
    }

    pub fn spinup_years(&self) -> usize {
        self.spinup_years
    }

    pub fn simulated_year(&self) -> usize {
        self.simulated_year
    }

    pub fn calendar_year(&self) -> i32 {
        self.layout.calendar_year
    }

    pub fn is_within_spinup(&self) -> bool {
        self.simulated_year < self.spinup_years
    }

    /// Layout of the current year
    pub fn layout(&self) -> &YearLayout {
        &self.layout
    }

    pub fn today(&self) -> SimulatedDay {
        let (month, day_of_month) = self.layout.month_and_day(self.day_of_year);
        SimulatedDay {
            simulated_year: self.simulated_year,
            calendar_year: self.layout.calendar_year,
            month,
            day_of_month,
            day_of_year: self.day_of_year,
            year_length: self.layout.len(),
            is_last_day_of_month: day_of_month + 1 == self.layout.days_in_month(month),
            is_last_day_of_year: self.day_of_year + 1 == self.layout.len(),
        }
    }

    /// Move to the next day, rolling over into the next year when needed.
    pub fn advance_one_day(&mut self) {
        self.day_of_year += 1;
        if self.day_of_year == self.layout.len() {
            self.day_of_year = 0;
            self.simulated_year += 1;
            let calendar_year =
                Self::year_for(&self.alignment, self.spinup_years, self.simulated_year);
            self.layout = YearLayout::new(self.mode, calendar_year);
        }
    }
}
