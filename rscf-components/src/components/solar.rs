//! Solar geometry at local noon
//!
//! Declination follows Cooper's sinusoidal approximation:
//!
//! $$\delta = 23.45^\circ \sin\left(\frac{2\pi\,(284 + n)}{365}\right)$$
//!
//! with $n$ the one-based day of the year. The signed noon zenith angle is
//! $\theta = \phi - \delta$: positive when the noon sun stands to the south of an observer at
//! latitude $\phi$ and negative when it stands to the north.

use rscf_core::calendar::DAYS_PER_NOLEAP_YEAR;
use rscf_core::timeseries::FloatValue;
use std::f64::consts::PI;

/// Maximum solar declination
/// unit: degrees
pub const AXIAL_TILT: FloatValue = 23.45;

/// Solar declination in degrees for a zero-based day of the year
pub fn declination(day_of_year: usize) -> FloatValue {
    let n = (day_of_year + 1) as FloatValue;
    AXIAL_TILT * (2.0 * PI * (284.0 + n) / DAYS_PER_NOLEAP_YEAR as FloatValue).sin()
}

/// Signed noon zenith angle in degrees
pub fn noon_zenith_angle(latitude: FloatValue, day_of_year: usize) -> FloatValue {
    latitude - declination(day_of_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn declination_extremes() {
        // Around 21 June (day 171) and 21 December (day 354)
        assert_abs_diff_eq!(declination(171), AXIAL_TILT, epsilon = 0.01);
        assert_abs_diff_eq!(declination(354), -AXIAL_TILT, epsilon = 0.01);
        assert!(declination(79).abs() < 1.0);
    }

    #[test]
    fn zenith_sign_follows_hemisphere() {
        assert!(noon_zenith_angle(50.0, 171) > 0.0);
        assert!(noon_zenith_angle(-40.0, 171) < 0.0);
        assert!(noon_zenith_angle(10.0, 171) < 0.0);
    }
}
