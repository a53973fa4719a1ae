//! Nitrogen deposition distributor
//!
//! Turns monthly dry and wet deposition into daily deposition. Dry deposition falls evenly
//! over the days of its month. Wet deposition follows the precipitation:
//!
//! $$N_d = \frac{D_m}{n_m} + \begin{cases} W_m \dfrac{p_d}{P_m} & P_m > 0 \\[4pt] \dfrac{W_m}{n_m} & P_m = 0 \end{cases}$$
//!
//! where $D_m$ and $W_m$ are the month's dry and wet deposition, $n_m$ its length in days,
//! $p_d$ the daily precipitation and $P_m$ the month's precipitation total.
//!
//! Monthly inputs are in gN m-2 month-1. The consumer expects kgN m-2 day-1, so every
//! daily value is multiplied by [`G_TO_KG`].

use rscf_core::calendar::{YearLayout, MONTHS_PER_YEAR};
use rscf_core::timeseries::FloatValue;

/// Conversion from gN to kgN
pub const G_TO_KG: FloatValue = 1.0e-3;

/// Daily deposition in kgN m-2 day-1.
///
/// `daily_precipitation` must have one value per day of `layout`.
pub fn distribute(
    dry_monthly: &[FloatValue; MONTHS_PER_YEAR],
    wet_monthly: &[FloatValue; MONTHS_PER_YEAR],
    daily_precipitation: &[FloatValue],
    layout: &YearLayout,
) -> Vec<FloatValue> {
    debug_assert_eq!(daily_precipitation.len(), layout.len());

    let mut daily = vec![0.0; layout.len()];
    for month in 0..MONTHS_PER_YEAR {
        let days = layout.month_days(month);
        let ndays = days.len() as FloatValue;
        let month_precipitation: FloatValue = daily_precipitation[days.clone()].iter().sum();

        for day in days {
            let dry = dry_monthly[month] / ndays;
            let wet = if month_precipitation > 0.0 {
                wet_monthly[month] * daily_precipitation[day] / month_precipitation
            } else {
                wet_monthly[month] / ndays
            };
            daily[day] = (dry + wet) * G_TO_KG;
        }
    }
    daily
}

/// Split an annual deposition rate into monthly amounts proportional to month length.
pub fn monthly_from_annual(
    annual: FloatValue,
    layout: &YearLayout,
) -> [FloatValue; MONTHS_PER_YEAR] {
    let year_length = layout.len() as FloatValue;
    let mut monthly = [0.0; MONTHS_PER_YEAR];
    for (month, value) in monthly.iter_mut().enumerate() {
        *value = annual * layout.days_in_month(month) as FloatValue / year_length;
    }
    monthly
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rscf_core::calendar::CalendarMode;

    #[test]
    fn monthly_totals_are_conserved() {
        let layout = YearLayout::new(CalendarMode::Gregorian, 2000);
        let dry = [0.1; 12];
        let wet = [0.2; 12];
        let mut precipitation = vec![0.0; layout.len()];
        // Rain on a handful of January days, dry February
        precipitation[3] = 4.0;
        precipitation[4] = 1.0;
        precipitation[20] = 5.0;
        for day in layout.month_days(2) {
            precipitation[day] = 1.0;
        }

        let daily = distribute(&dry, &wet, &precipitation, &layout);
        for month in 0..12 {
            let total: FloatValue = daily[layout.month_days(month)].iter().sum();
            assert_relative_eq!(total, 0.3 * G_TO_KG, epsilon = 1e-15);
        }

        // Wet deposition follows January precipitation
        assert_relative_eq!(daily[3], (0.1 / 31.0 + 0.2 * 0.4) * G_TO_KG, epsilon = 1e-15);
        assert_relative_eq!(daily[5], 0.1 / 31.0 * G_TO_KG, epsilon = 1e-15);
        // Even spread over a dry February of a leap year
        assert_relative_eq!(daily[40], 0.3 / 29.0 * G_TO_KG, epsilon = 1e-15);
    }

    #[test]
    fn annual_split_by_month_length() {
        let layout = YearLayout::new(CalendarMode::NoLeap, 1901);
        let monthly = monthly_from_annual(3.65, &layout);
        assert_relative_eq!(monthly[0], 0.31, epsilon = 1e-12);
        assert_relative_eq!(monthly[1], 0.28, epsilon = 1e-12);
        assert_relative_eq!(monthly.iter().sum::<FloatValue>(), 3.65, epsilon = 1e-12);
    }
}
