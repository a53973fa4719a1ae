//! Daily forcing of one gridcell.
//!
//! [`GridcellForcingBuilder`] collects the sources and settings of a gridcell and performs
//! all setup validation. The resulting [`GridcellForcing`] is driven one day at a time:
//!
//! 1. on the first day of each simulated year every variable's values for the year are
//!    selected (spin-up cycle or historical record) and turned into daily arrays;
//! 2. every day the gridcell's climate is read from those arrays and downscaled to each
//!    landform.
//!
//! A gridcell owns all of its state. Gridcells are independent of each other and can be run
//! on separate threads.

use crate::checkpoint::{GridcellCheckpoint, SeriesState};
use crate::co2::Co2Record;
use crate::config::ForcingConfig;
use log::{debug, info, warn};
use rscf_components::components::{
    distribute_ndep, ndep_monthly_from_annual, ClimateDay, Downscaler, DownscalingParameters,
    LandformRecord, Landforms, LocalClimate, PrecipitationGenerator, PrecipitationParameters,
};
use rscf_core::calendar::{Calendar, CalendarAlignment, SimulatedDay, YearLayout, MONTHS_PER_YEAR};
use rscf_core::errors::{ForcingError, ForcingResult};
use rscf_core::interpolate::{Bounds, YearlyValues};
use rscf_core::selector::ForcingSeries;
use rscf_core::standard_variables::{
    Quantity, VAR_INSOLATION, VAR_MAX_TEMPERATURE, VAR_MIN_TEMPERATURE, VAR_NDEP_DRY, VAR_NDEP_WET,
    VAR_PRECIPITATION, VAR_TEMPERATURE, VAR_WET_DAYS,
};
use rscf_core::timeseries::{check_co_required, FloatValue, Resolution, TimeSeriesSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Source shared between the builder and the gridcells it builds
pub type SharedSource = Arc<dyn TimeSeriesSource>;

/// Forcing produced for one simulated day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyForcing {
    pub day: SimulatedDay,
    pub gridcell: ClimateDay,
    /// One entry per landform, in landform order
    pub landforms: Vec<LocalClimate>,
}

/// Minimum and maximum temperature. Present only if both sources were supplied.
#[derive(Debug)]
struct DtrSeries {
    min: ForcingSeries,
    max: ForcingSeries,
}

#[derive(Debug)]
struct NdepSeries {
    dry: ForcingSeries,
    wet: ForcingSeries,
}

/// Daily arrays of the current simulated year
#[derive(Debug)]
struct YearForcing {
    temperature: Vec<FloatValue>,
    precipitation: Vec<FloatValue>,
    insolation: Vec<FloatValue>,
    ndep: Vec<FloatValue>,
    co2: FloatValue,
    extremes: Option<(Vec<FloatValue>, Vec<FloatValue>)>,
}

/// Build the forcing of one gridcell.
///
/// Temperature, precipitation, insolation, the location and a CO2 record are required.
/// Everything else is optional:
///
/// - wet days enable the stochastic precipitation generator (monthly precipitation only)
/// - minimum and maximum temperature together enable the diurnal temperature range
/// - dry and wet deposition sources together replace the constant deposition of the config
/// - without landform records the gridcell has only the reference landform
#[derive(Clone, Debug, Default)]
pub struct GridcellForcingBuilder {
    config: ForcingConfig,
    location: Option<(FloatValue, FloatValue, FloatValue)>,
    temperature: Option<SharedSource>,
    precipitation: Option<SharedSource>,
    insolation: Option<SharedSource>,
    wet_days: Option<SharedSource>,
    min_temperature: Option<SharedSource>,
    max_temperature: Option<SharedSource>,
    ndep_dry: Option<SharedSource>,
    ndep_wet: Option<SharedSource>,
    co2: Option<Co2Record>,
    landforms: Vec<LandformRecord>,
    precipitation_parameters: PrecipitationParameters,
}

impl GridcellForcingBuilder {
    pub fn new(config: ForcingConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ForcingConfig {
        &self.config
    }

    /// Set the gridcell's coordinates in degrees and its reference elevation in m
    pub fn with_location(
        &mut self,
        longitude: FloatValue,
        latitude: FloatValue,
        elevation: FloatValue,
    ) -> &mut Self {
        self.location = Some((longitude, latitude, elevation));
        self
    }

    pub fn with_temperature(&mut self, source: SharedSource) -> &mut Self {
        self.temperature = Some(source);
        self
    }

    pub fn with_precipitation(&mut self, source: SharedSource) -> &mut Self {
        self.precipitation = Some(source);
        self
    }

    pub fn with_insolation(&mut self, source: SharedSource) -> &mut Self {
        self.insolation = Some(source);
        self
    }

    pub fn with_wet_days(&mut self, source: SharedSource) -> &mut Self {
        self.wet_days = Some(source);
        self
    }

    pub fn with_min_temperature(&mut self, source: SharedSource) -> &mut Self {
        self.min_temperature = Some(source);
        self
    }

    pub fn with_max_temperature(&mut self, source: SharedSource) -> &mut Self {
        self.max_temperature = Some(source);
        self
    }

    pub fn with_ndep_dry(&mut self, source: SharedSource) -> &mut Self {
        self.ndep_dry = Some(source);
        self
    }

    pub fn with_ndep_wet(&mut self, source: SharedSource) -> &mut Self {
        self.ndep_wet = Some(source);
        self
    }

    pub fn with_co2(&mut self, record: Co2Record) -> &mut Self {
        self.co2 = Some(record);
        self
    }

    /// Landform classification of the gridcell. Must include the reference landform 0.
    pub fn with_landforms(&mut self, records: Vec<LandformRecord>) -> &mut Self {
        self.landforms = records;
        self
    }

    pub fn with_precipitation_parameters(
        &mut self,
        parameters: PrecipitationParameters,
    ) -> &mut Self {
        self.precipitation_parameters = parameters;
        self
    }

    /// Validate the inputs and set up the gridcell at the start of the simulation.
    pub fn build(&self) -> ForcingResult<GridcellForcing> {
        self.config.validate()?;

        let missing = |what: &str| ForcingError::MissingCapability {
            feature: "gridcell forcing".to_string(),
            missing: what.to_string(),
        };
        let (longitude, latitude, elevation) = self
            .location
            .ok_or_else(|| missing("gridcell location"))?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ForcingError::InvalidConfiguration(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        let temperature = self.temperature.clone().ok_or_else(|| missing("temperature source"))?;
        let precipitation = self
            .precipitation
            .clone()
            .ok_or_else(|| missing("precipitation source"))?;
        let insolation = self.insolation.clone().ok_or_else(|| missing("insolation source"))?;
        let co2 = self.co2.clone().ok_or_else(|| missing("CO2 record"))?;

        check_co_required(temperature.as_ref(), precipitation.as_ref())?;
        check_co_required(temperature.as_ref(), insolation.as_ref())?;

        let cycle_years = self.config.spinup_cycle_years;
        let detrend = self.config.detrend_spinup;

        let wet_days = match &self.wet_days {
            Some(source) if precipitation.resolution() == Resolution::Monthly => {
                check_co_required(precipitation.as_ref(), source.as_ref())?;
                Some(ForcingSeries::new(&VAR_WET_DAYS, source.clone(), cycle_years, false)?)
            }
            Some(_) => {
                warn!("Ignoring wet-day counts for daily precipitation");
                None
            }
            None => {
                if precipitation.resolution() == Resolution::Monthly {
                    warn!("No wet-day counts; monthly precipitation is interpolated");
                }
                None
            }
        };

        let dtr = match (&self.min_temperature, &self.max_temperature) {
            (Some(min), Some(max)) => {
                check_co_required(temperature.as_ref(), min.as_ref())?;
                check_co_required(temperature.as_ref(), max.as_ref())?;
                Some(DtrSeries {
                    min: ForcingSeries::new(
                        &VAR_MIN_TEMPERATURE,
                        min.clone(),
                        cycle_years,
                        detrend,
                    )?,
                    max: ForcingSeries::new(
                        &VAR_MAX_TEMPERATURE,
                        max.clone(),
                        cycle_years,
                        detrend,
                    )?,
                })
            }
            (None, None) => None,
            _ => {
                return Err(ForcingError::MissingCapability {
                    feature: "diurnal temperature range".to_string(),
                    missing: "both minimum and maximum temperature".to_string(),
                })
            }
        };

        let ndep = match (&self.ndep_dry, &self.ndep_wet) {
            (Some(dry), Some(wet)) => {
                check_co_required(dry.as_ref(), wet.as_ref())?;
                if dry.paleo_offset() != temperature.paleo_offset() {
                    return Err(ForcingError::IncompatibleSources {
                        first: temperature.name().to_string(),
                        second: dry.name().to_string(),
                        reason: format!(
                            "paleo offsets {} and {}",
                            temperature.paleo_offset(),
                            dry.paleo_offset()
                        ),
                    });
                }
                if dry.resolution() != Resolution::Monthly {
                    return Err(ForcingError::IncompatibleSources {
                        first: dry.name().to_string(),
                        second: wet.name().to_string(),
                        reason: "nitrogen deposition must be monthly".to_string(),
                    });
                }
                Some(NdepSeries {
                    dry: ForcingSeries::new(&VAR_NDEP_DRY, dry.clone(), 1, false)?,
                    wet: ForcingSeries::new(&VAR_NDEP_WET, wet.clone(), 1, false)?,
                })
            }
            (None, None) => None,
            _ => {
                return Err(ForcingError::MissingCapability {
                    feature: "nitrogen deposition".to_string(),
                    missing: "both dry and wet deposition".to_string(),
                })
            }
        };

        let landforms = if self.landforms.is_empty() {
            Landforms::reference_only(elevation)
        } else {
            Landforms::from_records(&self.landforms, elevation)?
        };

        let alignment = CalendarAlignment::from_first_timestep(
            temperature.date(0).year,
            temperature.paleo_offset(),
        );
        let calendar = Calendar::new(self.config.calendar, alignment, self.config.spinup_years);
        let co2 = match self.config.co2_spinup {
            Some(value) => co2.with_spinup_value(value),
            None => co2,
        };

        let forcing = GridcellForcing {
            longitude,
            latitude,
            elevation,
            temperature_bounds: self.config.temperature_bounds,
            insolation_bounds: self.config.insolation_bounds,
            ndep_dry_annual: self.config.ndep_dry_annual,
            ndep_wet_annual: self.config.ndep_wet_annual,
            temperature: ForcingSeries::new(&VAR_TEMPERATURE, temperature, cycle_years, detrend)?,
            precipitation: ForcingSeries::new(
                &VAR_PRECIPITATION,
                precipitation,
                cycle_years,
                false,
            )?,
            insolation: ForcingSeries::new(&VAR_INSOLATION, insolation, cycle_years, false)?,
            wet_days,
            dtr,
            ndep,
            co2,
            generator: PrecipitationGenerator::from_parameters(
                self.precipitation_parameters.clone(),
            ),
            downscaler: Downscaler::new(
                DownscalingParameters {
                    max_slope_gain: self.config.max_slope_gain,
                },
                latitude,
                elevation,
            ),
            landforms,
            seed: self.config.initial_seed,
            calendar,
            year: None,
        };

        info!(
            "Gridcell ({}, {}): {} landforms, historical period starts in {} \
                after {} spin-up years{}{}",
            longitude,
            latitude,
            forcing.landforms.len(),
            alignment.first_historical_year,
            self.config.spinup_years,
            if forcing.dtr.is_some() { ", diurnal temperature range" } else { "" },
            if forcing.ndep.is_some() { ", nitrogen deposition record" } else { "" },
        );
        Ok(forcing)
    }

    /// Set up the gridcell and resume it from a checkpoint.
    pub fn restore(&self, checkpoint: &GridcellCheckpoint) -> ForcingResult<GridcellForcing> {
        let mut forcing = self.build()?;
        forcing.apply_checkpoint(checkpoint)?;
        info!(
            "Gridcell ({}, {}): resumed at simulated year {}",
            forcing.longitude, forcing.latitude, checkpoint.simulated_year
        );
        Ok(forcing)
    }
}

/// Daily climate forcing of one gridcell
#[derive(Debug)]
pub struct GridcellForcing {
    longitude: FloatValue,
    latitude: FloatValue,
    elevation: FloatValue,
    temperature_bounds: Bounds,
    insolation_bounds: Bounds,
    ndep_dry_annual: FloatValue,
    ndep_wet_annual: FloatValue,
    temperature: ForcingSeries,
    precipitation: ForcingSeries,
    insolation: ForcingSeries,
    wet_days: Option<ForcingSeries>,
    dtr: Option<DtrSeries>,
    ndep: Option<NdepSeries>,
    co2: Co2Record,
    generator: PrecipitationGenerator,
    downscaler: Downscaler,
    landforms: Landforms,
    seed: u64,
    calendar: Calendar,
    year: Option<YearForcing>,
}

impl GridcellForcing {
    pub fn longitude(&self) -> FloatValue {
        self.longitude
    }

    pub fn latitude(&self) -> FloatValue {
        self.latitude
    }

    pub fn elevation(&self) -> FloatValue {
        self.elevation
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// The day the next call to [`next_day`](Self::next_day) produces
    pub fn today(&self) -> SimulatedDay {
        self.calendar.today()
    }

    pub fn simulated_year(&self) -> usize {
        self.calendar.simulated_year()
    }

    pub fn landforms(&self) -> &Landforms {
        &self.landforms
    }

    /// Current seed of the precipitation generator
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether minimum and maximum temperature, and hence the diurnal temperature range,
    /// are available
    pub fn has_dtr(&self) -> bool {
        self.dtr.is_some()
    }

    /// Series in checkpoint order
    fn series(&self) -> Vec<&ForcingSeries> {
        let mut series = vec![&self.temperature, &self.precipitation, &self.insolation];
        series.extend(self.wet_days.as_ref());
        if let Some(dtr) = &self.dtr {
            series.extend([&dtr.min, &dtr.max]);
        }
        if let Some(ndep) = &self.ndep {
            series.extend([&ndep.dry, &ndep.wet]);
        }
        series
    }

    fn series_mut(&mut self) -> Vec<&mut ForcingSeries> {
        let mut series = vec![&mut self.temperature, &mut self.precipitation, &mut self.insolation];
        series.extend(self.wet_days.as_mut());
        if let Some(dtr) = &mut self.dtr {
            series.extend([&mut dtr.min, &mut dtr.max]);
        }
        if let Some(ndep) = &mut self.ndep {
            series.extend([&mut ndep.dry, &mut ndep.wet]);
        }
        series
    }

    /// Forcing of the next simulated day.
    ///
    /// Rebuilds the yearly arrays on the first day of a year. Fails only on invariant
    /// violations, which must abort the run.
    pub fn next_day(&mut self) -> ForcingResult<DailyForcing> {
        let day = self.calendar.today();
        if day.is_first_day_of_year() {
            if self.calendar.simulated_year() == self.calendar.spinup_years() {
                info!(
                    "Gridcell ({}, {}): spin-up finished, historical period starts in {}",
                    self.longitude, self.latitude, day.calendar_year
                );
            }
            self.year = Some(self.build_year());
        }
        let Some(year) = &self.year else {
            return Err(ForcingError::Error(format!(
                "no forcing built for simulated year {}",
                day.simulated_year
            )));
        };

        let d = day.day_of_year;
        let extremes = year.extremes.as_ref().map(|(min, max)| (min[d], max[d]));
        let gridcell = ClimateDay {
            temperature: year.temperature[d],
            precipitation: year.precipitation[d],
            insolation: year.insolation[d],
            co2: year.co2,
            ndep: year.ndep[d],
            min_temperature: extremes.map(|(min, _)| min),
            max_temperature: extremes.map(|(_, max)| max),
            dtr: extremes.map(|(min, max)| (max - min).max(0.0)),
        };
        let landforms = self.downscaler.downscale_all(&gridcell, &self.landforms, &day)?;

        self.calendar.advance_one_day();
        Ok(DailyForcing {
            day,
            gridcell,
            landforms,
        })
    }

    /// Run whole simulated years until `years` years have been simulated in total.
    pub fn run_until<F>(&mut self, years: usize, mut consumer: F) -> ForcingResult<()>
    where
        F: FnMut(&DailyForcing),
    {
        while self.calendar.simulated_year() < years {
            let daily = self.next_day()?;
            consumer(&daily);
        }
        Ok(())
    }

    fn build_year(&mut self) -> YearForcing {
        let layout = *self.calendar.layout();
        let alignment = *self.calendar.alignment();
        debug!(
            "Gridcell ({}, {}): building simulated year {} (calendar year {}, {} days)",
            self.longitude,
            self.latitude,
            self.calendar.simulated_year(),
            layout.calendar_year,
            layout.len()
        );

        let temperature = self
            .temperature
            .yearly_data(&layout, &alignment)
            .into_daily(&layout, Quantity::Intensive, self.temperature_bounds);
        let insolation = self
            .insolation
            .yearly_data(&layout, &alignment)
            .into_daily(&layout, Quantity::Intensive, self.insolation_bounds);

        let precipitation = match self.precipitation.yearly_data(&layout, &alignment) {
            YearlyValues::Daily(daily) => daily,
            YearlyValues::Monthly(totals) => {
                let wet_days = self
                    .wet_days
                    .as_mut()
                    .and_then(|series| {
                        series
                            .yearly_data(&layout, &alignment)
                            .as_monthly()
                            .copied()
                    });
                self.generator.daily(&totals, wet_days.as_ref(), &layout, &mut self.seed)
            }
        };

        let extremes = self.dtr.as_mut().map(|dtr| {
            let min = dtr
                .min
                .yearly_data(&layout, &alignment)
                .into_daily(&layout, Quantity::Intensive, self.temperature_bounds);
            let max = dtr
                .max
                .yearly_data(&layout, &alignment)
                .into_daily(&layout, Quantity::Intensive, self.temperature_bounds);
            (min, max)
        });

        let (dry, wet) = match &mut self.ndep {
            Some(ndep) => (
                monthly_values(ndep.dry.yearly_data(&layout, &alignment), &layout),
                monthly_values(ndep.wet.yearly_data(&layout, &alignment), &layout),
            ),
            None => (
                ndep_monthly_from_annual(self.ndep_dry_annual, &layout),
                ndep_monthly_from_annual(self.ndep_wet_annual, &layout),
            ),
        };
        let ndep = distribute_ndep(&dry, &wet, &precipitation, &layout);

        self.co2.check_coverage(layout.calendar_year);

        YearForcing {
            temperature,
            precipitation,
            insolation,
            ndep,
            co2: self.co2.value(layout.calendar_year),
            extremes,
        }
    }

    /// Capture the state needed to resume this gridcell.
    ///
    /// Only possible at the start of a simulated year, before its forcing is built.
    pub fn checkpoint(&self) -> ForcingResult<GridcellCheckpoint> {
        let today = self.calendar.today();
        if !today.is_first_day_of_year() {
            return Err(ForcingError::Error(format!(
                "checkpoints are taken at the start of a simulated year, not on day {}",
                today.day_of_year
            )));
        }
        Ok(GridcellCheckpoint {
            simulated_year: self.calendar.simulated_year(),
            alignment: *self.calendar.alignment(),
            series: self
                .series()
                .into_iter()
                .map(|series| SeriesState {
                    cursor: series.cursor().clone(),
                    spinup_position: series.spinup().position(),
                })
                .collect(),
            seed: self.seed,
            landforms: self.landforms.clone(),
        })
    }

    fn apply_checkpoint(&mut self, checkpoint: &GridcellCheckpoint) -> ForcingResult<()> {
        if checkpoint.alignment != *self.calendar.alignment() {
            return Err(ForcingError::CheckpointMismatch(format!(
                "calendar alignment {:?} differs from {:?}",
                checkpoint.alignment,
                self.calendar.alignment()
            )));
        }
        if checkpoint.landforms != self.landforms {
            return Err(ForcingError::CheckpointMismatch(
                "landforms differ from the gridcell's classification".to_string(),
            ));
        }
        let mut series = self.series_mut();
        if checkpoint.series.len() != series.len() {
            return Err(ForcingError::CheckpointMismatch(format!(
                "{} variables saved, gridcell has {}",
                checkpoint.series.len(),
                series.len()
            )));
        }
        for (series, state) in series.iter_mut().zip(&checkpoint.series) {
            series.restore(&state.cursor, state.spinup_position)?;
        }

        self.seed = checkpoint.seed;
        self.calendar = Calendar::at_year(
            self.calendar.mode(),
            checkpoint.alignment,
            self.calendar.spinup_years(),
            checkpoint.simulated_year,
        );
        self.year = None;
        Ok(())
    }
}

/// Monthly values of a variable that is monthly by construction
fn monthly_values(values: YearlyValues, layout: &YearLayout) -> [FloatValue; MONTHS_PER_YEAR] {
    match values {
        YearlyValues::Monthly(monthly) => monthly,
        YearlyValues::Daily(daily) => {
            let mut monthly = [0.0; MONTHS_PER_YEAR];
            for (month, value) in monthly.iter_mut().enumerate() {
                *value = daily[layout.month_days(month)].iter().sum();
            }
            monthly
        }
    }
}
