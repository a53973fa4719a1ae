//! Monthly to daily disaggregation.
//!
//! Monthly forcing is turned into a daily series that
//!
//! - conserves every month's mean (intensive quantities) or total (extensive quantities),
//! - stays within configurable physical bounds,
//! - varies smoothly across month boundaries where the bounds allow it.
//!
//! # Algorithm
//!
//! 1. Daily values start as a linear interpolation between month midpoints, wrapping from
//!    December into January.
//! 2. A few passes of "conserve, then smooth" take out the step a pure per-month correction
//!    would leave at month boundaries.
//! 3. A final conserve pass makes the month means exact.
//!
//! Conservation under bounds is done with a single additive shift per month, found exactly
//! on the piecewise-linear function
//!
//! $$g(s) = \sum_{d \in m} \operatorname{clamp}(x_d + s, \min, \max)$$
//!
//! which is monotone in $s$, so any monthly target inside the bounds is met exactly.

use crate::calendar::{YearLayout, MONTHS_PER_YEAR};
use crate::standard_variables::Quantity;
use crate::timeseries::FloatValue;
use log::warn;
use serde::{Deserialize, Serialize};

/// Passes of conserve-then-smooth before the final conserve
const SMOOTHING_PASSES: usize = 3;

/// Physical bounds for daily values.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub minimum: FloatValue,
    pub maximum: FloatValue,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Bounds {
    pub fn new(minimum: FloatValue, maximum: FloatValue) -> Self {
        Self { minimum, maximum }
    }

    pub fn unbounded() -> Self {
        Self::new(FloatValue::NEG_INFINITY, FloatValue::INFINITY)
    }

    pub fn non_negative() -> Self {
        Self::new(0.0, FloatValue::INFINITY)
    }

    pub fn clamp(&self, value: FloatValue) -> FloatValue {
        value.max(self.minimum).min(self.maximum)
    }

    pub fn contains(&self, value: FloatValue) -> bool {
        value >= self.minimum && value <= self.maximum
    }

    pub fn is_valid(&self) -> bool {
        self.minimum <= self.maximum
    }
}

/// One variable's values for the current year.
#[derive(Clone, Debug, PartialEq)]
pub enum YearlyValues {
    /// Twelve monthly values: totals for extensive and means for intensive quantities
    Monthly([FloatValue; MONTHS_PER_YEAR]),
    /// One value per day of the year
    Daily(Vec<FloatValue>),
}

impl YearlyValues {
    /// Daily values for the year.
    ///
    /// Daily input is returned unchanged. Monthly input is disaggregated with
    /// [`disaggregate`].
    pub fn into_daily(
        self,
        layout: &YearLayout,
        quantity: Quantity,
        bounds: Bounds,
    ) -> Vec<FloatValue> {
        match self {
            YearlyValues::Daily(values) => values,
            YearlyValues::Monthly(monthly) => disaggregate(&monthly, layout, quantity, bounds),
        }
    }

    pub fn as_monthly(&self) -> Option<&[FloatValue; MONTHS_PER_YEAR]> {
        match self {
            YearlyValues::Monthly(values) => Some(values),
            YearlyValues::Daily(_) => None,
        }
    }
}

/// Disaggregate twelve monthly values into daily values.
pub fn disaggregate(
    monthly: &[FloatValue; MONTHS_PER_YEAR],
    layout: &YearLayout,
    quantity: Quantity,
    bounds: Bounds,
) -> Vec<FloatValue> {
    match quantity {
        Quantity::Intensive => interp_monthly_means_conserve(monthly, layout, bounds),
        Quantity::Extensive => interp_monthly_totals_conserve(monthly, layout, bounds),
    }
}

/// Daily values whose monthly means equal `monthly_means`.
pub fn interp_monthly_means_conserve(
    monthly_means: &[FloatValue; MONTHS_PER_YEAR],
    layout: &YearLayout,
    bounds: Bounds,
) -> Vec<FloatValue> {
    let mut targets = *monthly_means;
    for (month, target) in targets.iter_mut().enumerate() {
        if !bounds.contains(*target) {
            warn!(
                "Monthly mean {} for month {} is outside [{}, {}]; it cannot be conserved",
                target,
                month + 1,
                bounds.minimum,
                bounds.maximum
            );
            *target = bounds.clamp(*target);
        }
    }

    let mut daily = interpolate_midpoints(&targets, layout);
    for _ in 0..SMOOTHING_PASSES {
        conserve_months(&mut daily, &targets, layout, &bounds);
        smooth(&mut daily);
    }
    conserve_months(&mut daily, &targets, layout, &bounds);
    daily
}

/// Daily values whose monthly sums equal `monthly_totals`.
pub fn interp_monthly_totals_conserve(
    monthly_totals: &[FloatValue; MONTHS_PER_YEAR],
    layout: &YearLayout,
    bounds: Bounds,
) -> Vec<FloatValue> {
    let mut means = [0.0; MONTHS_PER_YEAR];
    for (month, mean) in means.iter_mut().enumerate() {
        *mean = monthly_totals[month] / layout.days_in_month(month) as FloatValue;
    }
    interp_monthly_means_conserve(&means, layout, bounds)
}

/// Linear interpolation between month midpoints, cyclic over the year.
fn interpolate_midpoints(
    means: &[FloatValue; MONTHS_PER_YEAR],
    layout: &YearLayout,
) -> Vec<FloatValue> {
    let year_length = layout.len() as FloatValue;
    let midpoints: Vec<FloatValue> = (0..MONTHS_PER_YEAR)
        .map(|m| layout.month_start(m) as FloatValue + layout.days_in_month(m) as FloatValue / 2.0)
        .collect();
    let last = MONTHS_PER_YEAR - 1;

    (0..layout.len())
        .map(|day| {
            let x = day as FloatValue + 0.5;
            let (x0, y0, x1, y1) = if x < midpoints[0] {
                (midpoints[last] - year_length, means[last], midpoints[0], means[0])
            } else if x >= midpoints[last] {
                (midpoints[last], means[last], midpoints[0] + year_length, means[0])
            } else {
                let m = midpoints
                    .iter()
                    .rposition(|&mid| mid <= x)
                    .unwrap_or(0);
                (midpoints[m], means[m], midpoints[m + 1], means[m + 1])
            };
            y0 + (y1 - y0) * (x - x0) / (x1 - x0)
        })
        .collect()
}

/// Three-point moving average, cyclic over the year
fn smooth(values: &mut [FloatValue]) {
    let n = values.len();
    if n < 3 {
        return;
    }
    let original = values.to_vec();
    for i in 0..n {
        let prev = original[(i + n - 1) % n];
        let next = original[(i + 1) % n];
        values[i] = (prev + original[i] + next) / 3.0;
    }
}

fn conserve_months(
    daily: &mut [FloatValue],
    targets: &[FloatValue; MONTHS_PER_YEAR],
    layout: &YearLayout,
    bounds: &Bounds,
) {
    for (month, target) in targets.iter().enumerate() {
        conserve_bounded(&mut daily[layout.month_days(month)], *target, bounds);
    }
}

/// Shift `values` by one constant, clamping to `bounds`, so that their mean is `target_mean`.
///
/// `target_mean` must lie within `bounds`.
pub fn conserve_bounded(values: &mut [FloatValue], target_mean: FloatValue, bounds: &Bounds) {
    if values.is_empty() {
        return;
    }
    let n = values.len() as FloatValue;
    let target = target_mean * n;
    let vmin = values.iter().copied().fold(FloatValue::INFINITY, FloatValue::min);
    let vmax = values.iter().copied().fold(FloatValue::NEG_INFINITY, FloatValue::max);

    // Bracket: at `lo` every value is at or below the target, at `hi` at or above it
    let lo = if bounds.minimum.is_finite() {
        bounds.minimum - vmax
    } else {
        target_mean - vmax
    };
    let hi = if bounds.maximum.is_finite() {
        bounds.maximum - vmin
    } else {
        target_mean - vmin
    };

    let total = |shift: FloatValue| -> FloatValue {
        values.iter().map(|v| bounds.clamp(v + shift)).sum()
    };

    let mut knots: Vec<FloatValue> = values
        .iter()
        .flat_map(|v| [bounds.minimum - v, bounds.maximum - v])
        .filter(|k| *k > lo && *k < hi)
        .collect();
    knots.push(hi);
    knots.sort_by(FloatValue::total_cmp);

    let mut shift = hi;
    let (mut prev, mut prev_total) = (lo, total(lo));
    if prev_total >= target {
        shift = lo;
    } else {
        for knot in knots {
            let knot_total = total(knot);
            if knot_total >= target {
                shift = if knot_total > prev_total {
                    prev + (target - prev_total) * (knot - prev) / (knot_total - prev_total)
                } else {
                    knot
                };
                break;
            }
            prev = knot;
            prev_total = knot_total;
        }
    }

    for v in values.iter_mut() {
        *v = bounds.clamp(*v + shift);
    }
}
