//! The time-series source boundary.
//!
//! File-format readers live outside this workspace. They expose a single named variable for
//! one gridcell as an ordered sequence of dated values through the [`TimeSeriesSource`]
//! trait, and are injected into a gridcell when it is set up.
//!
//! [`InMemorySource`] implements the trait over vectors. It is used by readers that load a
//! whole series up front and throughout the tests.

use crate::calendar::{is_gregorian_leap_year, month_lengths, FEBRUARY, MONTHS_PER_YEAR};
use crate::errors::{ForcingError, ForcingResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type FloatValue = f64;

/// Date of a source timestep.
///
/// Month and day are zero based. Ordering is chronological.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceDate {
    pub year: i32,
    pub month: usize,
    pub day: usize,
}

impl SourceDate {
    pub fn new(year: i32, month: usize, day: usize) -> Self {
        Self { year, month, day }
    }

    pub fn is_leap_day(&self) -> bool {
        self.month == FEBRUARY && self.day == 28
    }
}

impl fmt::Display for SourceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month + 1, self.day + 1)
    }
}

/// Calendar a source's dates are expressed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceCalendar {
    /// Gregorian leap years
    Standard,
    /// No year has a 29th of February
    NoLeap,
    /// Every year has a 29th of February
    AllLeap,
}

impl SourceCalendar {
    /// Parse a CF `calendar` attribute.
    pub fn from_cf_name(name: &str) -> ForcingResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Ok(SourceCalendar::Standard),
            "noleap" | "no_leap" | "365_day" => Ok(SourceCalendar::NoLeap),
            "all_leap" | "366_day" => Ok(SourceCalendar::AllLeap),
            _ => Err(ForcingError::UnsupportedCalendar(name.to_string())),
        }
    }

    pub fn has_leap_day(&self, year: i32) -> bool {
        match self {
            SourceCalendar::Standard => is_gregorian_leap_year(year),
            SourceCalendar::NoLeap => false,
            SourceCalendar::AllLeap => true,
        }
    }

    pub fn days_in_month(&self, year: i32, month: usize) -> usize {
        month_lengths(self.has_leap_day(year))[month]
    }

    /// The day after `date`
    pub fn next_day(&self, date: SourceDate) -> SourceDate {
        if date.day + 1 < self.days_in_month(date.year, date.month) {
            SourceDate::new(date.year, date.month, date.day + 1)
        } else {
            Self::next_month(date)
        }
    }

    /// First day of the month after `date`
    pub fn next_month(date: SourceDate) -> SourceDate {
        if date.month + 1 < MONTHS_PER_YEAR {
            SourceDate::new(date.year, date.month + 1, 0)
        } else {
            SourceDate::new(date.year + 1, 0, 0)
        }
    }
}

/// Temporal resolution of a source.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Daily,
    Monthly,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Daily => write!(f, "daily"),
            Resolution::Monthly => write!(f, "monthly"),
        }
    }
}

/// Spatial footprint of a source, used to check that co-required variables line up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialDomain {
    /// Longitude/latitude extent `[lon_min, lon_max, lat_min, lat_max]`
    pub extent: [FloatValue; 4],
    pub cells: usize,
}

/// Read-only access to one variable of one gridcell.
pub trait TimeSeriesSource: fmt::Debug + Send + Sync {
    /// Variable name as stored in the source (e.g. `tas`)
    fn name(&self) -> &str;

    fn timesteps(&self) -> usize;

    /// Date of timestep `index`
    fn date(&self, index: usize) -> SourceDate;

    fn calendar(&self) -> SourceCalendar;

    /// Value of timestep `index`, in the source's own units
    fn value(&self, index: usize) -> FloatValue;

    fn standard_name(&self) -> &str;

    fn units(&self) -> &str;

    /// Offset between the simulated calendar and this source's year numbering
    fn paleo_offset(&self) -> i32 {
        0
    }

    /// Whether gridcells are addressed by index (reduced grid) rather than by coordinate
    fn is_reduced(&self) -> bool {
        false
    }

    fn spatial_domain(&self) -> SpatialDomain;

    fn same_spatial_domain(&self, other: &dyn TimeSeriesSource) -> bool {
        self.is_reduced() == other.is_reduced() && self.spatial_domain() == other.spatial_domain()
    }

    /// Resolution inferred from the spacing of the first two timesteps
    fn resolution(&self) -> Resolution {
        if self.timesteps() < 2 {
            return Resolution::Monthly;
        }
        let (first, second) = (self.date(0), self.date(1));
        let same_month = first.year == second.year && first.month == second.month;
        if same_month || second == self.calendar().next_day(first) {
            Resolution::Daily
        } else {
            Resolution::Monthly
        }
    }
}

/// Check that two variables required together share resolution, time span, paleo offset
/// and spatial domain.
pub fn check_co_required(
    first: &dyn TimeSeriesSource,
    second: &dyn TimeSeriesSource,
) -> ForcingResult<()> {
    let incompatible = |reason: String| ForcingError::IncompatibleSources {
        first: first.name().to_string(),
        second: second.name().to_string(),
        reason,
    };

    if first.timesteps() == 0 || second.timesteps() == 0 {
        return Err(incompatible("empty source".to_string()));
    }
    if first.resolution() != second.resolution() {
        return Err(incompatible(format!(
            "{} vs {} resolution",
            first.resolution(),
            second.resolution()
        )));
    }
    if first.date(0) != second.date(0) {
        return Err(incompatible(format!(
            "records start on {} and {}",
            first.date(0),
            second.date(0)
        )));
    }
    let (first_last, second_last) = (
        first.date(first.timesteps() - 1),
        second.date(second.timesteps() - 1),
    );
    if first_last != second_last {
        return Err(incompatible(format!("records end on {first_last} and {second_last}")));
    }
    if first.calendar() == second.calendar() && first.timesteps() != second.timesteps() {
        return Err(incompatible(format!(
            "{} and {} timesteps",
            first.timesteps(),
            second.timesteps()
        )));
    }
    if first.paleo_offset() != second.paleo_offset() {
        return Err(incompatible(format!(
            "paleo offsets {} and {}",
            first.paleo_offset(),
            second.paleo_offset()
        )));
    }
    if !first.same_spatial_domain(second) {
        return Err(incompatible("different spatial domains".to_string()));
    }
    Ok(())
}

/// A source held entirely in memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InMemorySource {
    name: String,
    standard_name: String,
    units: String,
    calendar: SourceCalendar,
    paleo_offset: i32,
    reduced: bool,
    domain: SpatialDomain,
    dates: Vec<SourceDate>,
    values: Vec<FloatValue>,
}

impl InMemorySource {
    /// Create a source from explicit dates and values.
    ///
    /// # Panics
    ///
    /// Panics if `dates` and `values` differ in length.
    pub fn new(
        name: &str,
        standard_name: &str,
        units: &str,
        calendar: SourceCalendar,
        dates: Vec<SourceDate>,
        values: Vec<FloatValue>,
    ) -> Self {
        assert_eq!(
            dates.len(),
            values.len(),
            "Dates and values must have the same length"
        );
        Self {
            name: name.to_string(),
            standard_name: standard_name.to_string(),
            units: units.to_string(),
            calendar,
            paleo_offset: 0,
            reduced: false,
            domain: SpatialDomain {
                extent: [-180.0, 180.0, -90.0, 90.0],
                cells: 1,
            },
            dates,
            values,
        }
    }

    /// Daily source starting on the first of January of `first_year`.
    ///
    /// One date is generated per value following `calendar`.
    pub fn daily(
        name: &str,
        standard_name: &str,
        units: &str,
        calendar: SourceCalendar,
        first_year: i32,
        values: Vec<FloatValue>,
    ) -> Self {
        let mut dates = Vec::with_capacity(values.len());
        let mut date = SourceDate::new(first_year, 0, 0);
        for _ in 0..values.len() {
            dates.push(date);
            date = calendar.next_day(date);
        }
        Self::new(name, standard_name, units, calendar, dates, values)
    }

    /// Monthly source starting in January of `first_year`.
    pub fn monthly(
        name: &str,
        standard_name: &str,
        units: &str,
        calendar: SourceCalendar,
        first_year: i32,
        values: Vec<FloatValue>,
    ) -> Self {
        let mut dates = Vec::with_capacity(values.len());
        let mut date = SourceDate::new(first_year, 0, 0);
        for _ in 0..values.len() {
            dates.push(date);
            date = SourceCalendar::next_month(date);
        }
        Self::new(name, standard_name, units, calendar, dates, values)
    }

    pub fn with_paleo_offset(mut self, paleo_offset: i32) -> Self {
        self.paleo_offset = paleo_offset;
        self
    }

    pub fn with_domain(mut self, domain: SpatialDomain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_reduced(mut self, reduced: bool) -> Self {
        self.reduced = reduced;
        self
    }

    pub fn values(&self) -> &[FloatValue] {
        &self.values
    }
}

impl TimeSeriesSource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timesteps(&self) -> usize {
        self.values.len()
    }

    fn date(&self, index: usize) -> SourceDate {
        self.dates[index]
    }

    fn calendar(&self) -> SourceCalendar {
        self.calendar
    }

    fn value(&self, index: usize) -> FloatValue {
        self.values[index]
    }

    fn standard_name(&self) -> &str {
        &self.standard_name
    }

    fn units(&self) -> &str {
        &self.units
    }

    fn paleo_offset(&self) -> i32 {
        self.paleo_offset
    }

    fn is_reduced(&self) -> bool {
        self.reduced
    }

    fn spatial_domain(&self) -> SpatialDomain {
        self.domain.clone()
    }
}
