//! Stochastic wet-day precipitation generator
//!
//! Spreads monthly precipitation totals over the days of each month. When monthly wet-day
//! counts are available, a seeded random process picks which days are wet and how much
//! falls on each of them. Without wet-day counts the totals are interpolated conservatively
//! with a zero lower bound.
//!
//! # Wet-day amounts
//!
//! Each wet day draws an unnormalized amount
//!
//! $$a_d = a_{min} + (-\ln u_d)^{c}, \qquad u_d \sim U(0, 1]$$
//!
//! and the amounts are then scaled so that they sum exactly to the monthly total $P_m$:
//!
//! $$p_d = P_m \frac{a_d}{\sum_{d'} a_{d'}}$$
//!
//! # Seed
//!
//! The generator owns no state. The caller threads a `u64` seed through every call: a fresh
//! generator is seeded from it and a new seed is drawn from that generator on return. The
//! same seed and the same inputs always give the same daily sequence and the same new seed.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rscf_core::calendar::{YearLayout, MONTHS_PER_YEAR};
use rscf_core::interpolate::{interp_monthly_totals_conserve, Bounds};
use rscf_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};

/// Parameters for the wet-day generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecipitationParameters {
    /// Floor added to every unnormalized wet-day amount
    /// unit: mm
    /// default: 0.1
    pub min_wet_day_amount: FloatValue,

    /// Exponent $c$ applied to the exponential draw. Values above one give a heavier tail.
    /// unit: dimensionless
    /// default: 1.3
    pub amount_shape: FloatValue,

    /// Extra selection weight per wet neighbour when picking wet days. Zero picks wet days
    /// uniformly, larger values cluster them into spells.
    /// unit: dimensionless
    /// default: 2.0
    pub persistence_weight: FloatValue,
}

impl Default for PrecipitationParameters {
    fn default() -> Self {
        Self {
            min_wet_day_amount: 0.1,
            amount_shape: 1.3,
            persistence_weight: 2.0,
        }
    }
}

/// Distributes monthly precipitation totals over days
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrecipitationGenerator {
    parameters: PrecipitationParameters,
}

impl PrecipitationGenerator {
    pub fn from_parameters(parameters: PrecipitationParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &PrecipitationParameters {
        &self.parameters
    }

    /// Daily precipitation for one year.
    ///
    /// # Arguments
    ///
    /// * `monthly_totals` - Precipitation per month in mm. Rates must already be integrated.
    /// * `wet_days` - Optional number of wet days per month
    /// * `layout` - Layout of the simulated year
    /// * `seed` - Random seed, replaced by its successor when wet days are generated
    pub fn daily(
        &self,
        monthly_totals: &[FloatValue; MONTHS_PER_YEAR],
        wet_days: Option<&[FloatValue; MONTHS_PER_YEAR]>,
        layout: &YearLayout,
        seed: &mut u64,
    ) -> Vec<FloatValue> {
        let Some(wet_days) = wet_days else {
            debug!("No wet-day counts, interpolating precipitation totals");
            return interp_monthly_totals_conserve(monthly_totals, layout, Bounds::non_negative());
        };

        let mut rng = StdRng::seed_from_u64(*seed);
        let mut daily = Vec::with_capacity(layout.len());
        for month in 0..MONTHS_PER_YEAR {
            let ndays = layout.days_in_month(month);
            daily.extend(self.month(monthly_totals[month], wet_days[month], ndays, &mut rng));
        }
        *seed = rng.next_u64();
        daily
    }

    /// Daily amounts for one month of `ndays` days.
    ///
    /// A month with a positive total has at least one wet day, even if its wet-day count
    /// rounds to zero. A month with a non-positive total is completely dry.
    pub fn month<R: Rng>(
        &self,
        total: FloatValue,
        wet_days: FloatValue,
        ndays: usize,
        rng: &mut R,
    ) -> Vec<FloatValue> {
        let mut daily = vec![0.0; ndays];
        if total <= 0.0 || ndays == 0 {
            return daily;
        }

        let n_wet = (wet_days.max(0.0).round() as usize).clamp(1, ndays);
        let wet = self.pick_wet_days(n_wet, ndays, rng);

        let mut sum = 0.0;
        for (day, is_wet) in wet.iter().enumerate() {
            if *is_wet {
                let u: FloatValue = 1.0 - rng.random::<FloatValue>();
                let amount = self.parameters.min_wet_day_amount
                    + (-u.ln()).powf(self.parameters.amount_shape);
                daily[day] = amount;
                sum += amount;
            }
        }
        let scale = total / sum;
        daily.iter_mut().for_each(|v| *v *= scale);
        daily
    }

    /// Choose `n_wet` distinct days out of `ndays`.
    ///
    /// Each remaining dry day is picked with weight $1 + w\,k$ where $k$ is the number of its
    /// neighbours that are already wet.
    fn pick_wet_days<R: Rng>(&self, n_wet: usize, ndays: usize, rng: &mut R) -> Vec<bool> {
        let mut wet = vec![false; ndays];
        let weight = |wet: &[bool], day: usize| {
            let before = day > 0 && wet[day - 1];
            let after = day + 1 < ndays && wet[day + 1];
            1.0 + self.parameters.persistence_weight * (before as u8 + after as u8) as FloatValue
        };

        for _ in 0..n_wet {
            let total: FloatValue = (0..ndays).filter(|d| !wet[*d]).map(|d| weight(&wet, d)).sum();
            let mut target = rng.random::<FloatValue>() * total;
            let mut chosen = None;
            for day in (0..ndays).filter(|d| !wet[*d]) {
                chosen = Some(day);
                target -= weight(&wet, day);
                if target < 0.0 {
                    break;
                }
            }
            // Rounding can leave `target` marginally positive, in which case the last dry day wins
            if let Some(day) = chosen {
                wet[day] = true;
            }
        }
        wet
    }
}
