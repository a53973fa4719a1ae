//! Landforms and the local-climate downscaler
//!
//! A gridcell is divided into landforms: sub-grid units with their own elevation, slope and
//! aspect. Landform 0 is reserved for the unmodified gridcell. Every simulated day the
//! gridcell climate is downscaled to each landform:
//!
//! - temperature (mean, minimum and maximum) follows a fixed elevation lapse rate
//!   $$T_{lf} = T_{gc} + (z_{gc} - z_{lf})\,\Gamma, \qquad \Gamma = 0.65\,^\circ\mathrm{C}/100\,\mathrm{m}$$
//! - insolation is projected onto the sloping surface using the noon sun (see
//!   [`Downscaler::local_insolation`])
//! - precipitation, CO2 and nitrogen deposition are copied unchanged
//!
//! Local insolation must never be negative. A negative (or NaN) value indicates a geometry
//! or unit error upstream and is returned as [`ForcingError::NegativeInsolation`].

use crate::components::solar::noon_zenith_angle;
use rscf_core::calendar::SimulatedDay;
use rscf_core::errors::{ForcingError, ForcingResult};
use rscf_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Temperature lapse rate
/// unit: degC m-1
pub const TEMP_LAPSE_RATE: FloatValue = 0.65 / 100.0;

/// Id of the landform standing for the unmodified gridcell
pub const REFERENCE_LANDFORM: u32 = 0;

/// Aspect value used by classification sources for landforms without an aspect
pub const NO_ASPECT: FloatValue = -1.0;

/// Tolerance on the sum of landform fractions
const FRACTION_TOLERANCE: FloatValue = 1.0e-3;

/// Compass class of a landform's average aspect
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectClass {
    /// Flat, ridge or valley landforms without a defined aspect
    None,
    North,
    East,
    South,
    West,
}

impl AspectClass {
    /// Classify an aspect in degrees clockwise from north.
    pub fn from_aspect(aspect: Option<FloatValue>) -> Self {
        match aspect {
            None => AspectClass::None,
            Some(a) if !(45.0..315.0).contains(&a) => AspectClass::North,
            Some(a) if a < 135.0 => AspectClass::East,
            Some(a) if a < 225.0 => AspectClass::South,
            Some(_) => AspectClass::West,
        }
    }
}

/// Slope class of a landform, by slope angle in degrees
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlopeClass {
    /// Below 2 degrees
    Level,
    /// 2 to 6 degrees
    Gentle,
    /// 6 to 16 degrees
    Moderate,
    /// 16 to 30 degrees
    Steep,
    /// 30 degrees and above
    VerySteep,
}

impl SlopeClass {
    pub fn from_slope(slope: FloatValue) -> Self {
        match slope {
            s if s < 2.0 => SlopeClass::Level,
            s if s < 6.0 => SlopeClass::Gentle,
            s if s < 16.0 => SlopeClass::Moderate,
            s if s < 30.0 => SlopeClass::Steep,
            _ => SlopeClass::VerySteep,
        }
    }
}

/// A landform as delivered by a classification source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandformRecord {
    pub id: u32,
    /// Fraction of the gridcell area
    pub fraction: FloatValue,
    /// unit: m
    pub elevation: FloatValue,
    /// Average slope
    /// unit: degrees
    pub slope: FloatValue,
    /// Average aspect clockwise from north, negative if undefined
    /// unit: degrees
    pub aspect: FloatValue,
    /// Slope angle corrected for the spread of aspects within the landform
    /// unit: degrees
    pub aspect_corrected_slope: FloatValue,
    #[serde(default = "default_soil_depth_modifier")]
    pub soil_depth_modifier: FloatValue,
}

fn default_soil_depth_modifier() -> FloatValue {
    1.0
}

/// A validated landform. Immutable for the lifetime of its gridcell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landform {
    pub id: u32,
    pub aspect_class: AspectClass,
    pub slope_class: SlopeClass,
    pub elevation: FloatValue,
    pub fraction: FloatValue,
    /// Average aspect in degrees, `None` for landforms without one
    pub aspect: Option<FloatValue>,
    pub slope: FloatValue,
    pub aspect_corrected_slope: FloatValue,
    pub soil_depth_modifier: FloatValue,
}

impl Landform {
    /// Validate a record. The reference landform takes the gridcell elevation and never has
    /// an aspect.
    pub fn from_record(
        record: &LandformRecord,
        gridcell_elevation: FloatValue,
    ) -> ForcingResult<Self> {
        let invalid = |reason: String| {
            ForcingError::InvalidLandforms(format!("landform {}: {}", record.id, reason))
        };

        if !(0.0..=1.0).contains(&record.fraction) {
            return Err(invalid(format!("fraction {} outside [0, 1]", record.fraction)));
        }
        for (name, angle) in [
            ("slope", record.slope),
            ("corrected slope", record.aspect_corrected_slope),
        ] {
            if !(0.0..90.0).contains(&angle) {
                return Err(invalid(format!("{} {} outside [0, 90)", name, angle)));
            }
        }
        if record.aspect >= 360.0 || record.aspect.is_nan() {
            return Err(invalid(format!("aspect {} outside [0, 360)", record.aspect)));
        }
        if !record.elevation.is_finite() {
            return Err(invalid("elevation is not finite".to_string()));
        }

        let reference = record.id == REFERENCE_LANDFORM;
        let aspect = if reference || record.aspect < 0.0 {
            None
        } else {
            Some(record.aspect)
        };

        Ok(Self {
            id: record.id,
            aspect_class: AspectClass::from_aspect(aspect),
            slope_class: SlopeClass::from_slope(record.slope),
            elevation: if reference { gridcell_elevation } else { record.elevation },
            fraction: record.fraction,
            aspect,
            slope: record.slope,
            aspect_corrected_slope: record.aspect_corrected_slope,
            soil_depth_modifier: record.soil_depth_modifier,
        })
    }

    pub fn is_reference(&self) -> bool {
        self.id == REFERENCE_LANDFORM
    }
}

/// The landforms of one gridcell.
///
/// Always contains the reference landform, ids are unique and fractions sum to one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landforms {
    landforms: Vec<Landform>,
}

impl Landforms {
    pub fn from_records(
        records: &[LandformRecord],
        gridcell_elevation: FloatValue,
    ) -> ForcingResult<Self> {
        let landforms = records
            .iter()
            .map(|record| Landform::from_record(record, gridcell_elevation))
            .collect::<ForcingResult<Vec<_>>>()?;
        Self::from_landforms(landforms)
    }

    /// A gridcell without sub-grid classification: only the reference landform.
    pub fn reference_only(gridcell_elevation: FloatValue) -> Self {
        Self {
            landforms: vec![Landform {
                id: REFERENCE_LANDFORM,
                aspect_class: AspectClass::None,
                slope_class: SlopeClass::Level,
                elevation: gridcell_elevation,
                fraction: 1.0,
                aspect: None,
                slope: 0.0,
                aspect_corrected_slope: 0.0,
                soil_depth_modifier: default_soil_depth_modifier(),
            }],
        }
    }

    /// Validate an already built list, e.g. one restored from a checkpoint.
    pub fn from_landforms(landforms: Vec<Landform>) -> ForcingResult<Self> {
        let mut ids = HashSet::new();
        for landform in &landforms {
            if !ids.insert(landform.id) {
                return Err(ForcingError::InvalidLandforms(format!(
                    "duplicate landform id {}",
                    landform.id
                )));
            }
        }
        if !ids.contains(&REFERENCE_LANDFORM) {
            return Err(ForcingError::InvalidLandforms(
                "the reference landform 0 is missing".to_string(),
            ));
        }

        let total: FloatValue = landforms.iter().map(|l| l.fraction).sum();
        if (total - 1.0).abs() > FRACTION_TOLERANCE {
            return Err(ForcingError::InvalidLandforms(format!(
                "fractions sum to {total}, expected 1"
            )));
        }
        Ok(Self { landforms })
    }

    pub fn len(&self) -> usize {
        self.landforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landforms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landform> {
        self.landforms.iter()
    }

    pub fn get(&self, id: u32) -> Option<&Landform> {
        self.landforms.iter().find(|l| l.id == id)
    }

    pub fn as_slice(&self) -> &[Landform] {
        &self.landforms
    }
}

/// Daily climate of a whole gridcell
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimateDay {
    /// unit: degC
    pub temperature: FloatValue,
    /// unit: mm
    pub precipitation: FloatValue,
    /// unit: W m-2
    pub insolation: FloatValue,
    /// unit: ppm
    pub co2: FloatValue,
    /// unit: kgN m-2 day-1
    pub ndep: FloatValue,
    pub min_temperature: Option<FloatValue>,
    pub max_temperature: Option<FloatValue>,
    /// Diurnal temperature range, available only with minimum and maximum temperature
    pub dtr: Option<FloatValue>,
}

impl ClimateDay {
    pub fn diurnal_temperature_range(&self) -> ForcingResult<FloatValue> {
        self.dtr.ok_or_else(|| ForcingError::MissingCapability {
            feature: "diurnal temperature range".to_string(),
            missing: "minimum and maximum temperature".to_string(),
        })
    }
}

/// Daily climate of one landform
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalClimate {
    pub landform: u32,
    pub climate: ClimateDay,
}

/// Parameters for the local-climate downscaler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownscalingParameters {
    /// Optional upper limit of the slope projection factor. Bounds the gain of sun-facing
    /// slopes when the noon sun is close to the horizon.
    /// unit: dimensionless
    /// default: none
    pub max_slope_gain: Option<FloatValue>,
}

impl Default for DownscalingParameters {
    fn default() -> Self {
        Self {
            max_slope_gain: None,
        }
    }
}

/// Downscales gridcell climate to landforms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Downscaler {
    parameters: DownscalingParameters,
    latitude: FloatValue,
    gridcell_elevation: FloatValue,
}

impl Downscaler {
    pub fn new(
        parameters: DownscalingParameters,
        latitude: FloatValue,
        gridcell_elevation: FloatValue,
    ) -> Self {
        Self {
            parameters,
            latitude,
            gridcell_elevation,
        }
    }

    pub fn latitude(&self) -> FloatValue {
        self.latitude
    }

    pub fn gridcell_elevation(&self) -> FloatValue {
        self.gridcell_elevation
    }

    /// Temperature at the landform's elevation
    pub fn local_temperature(&self, temperature: FloatValue, landform: &Landform) -> FloatValue {
        temperature + (self.gridcell_elevation - landform.elevation) * TEMP_LAPSE_RATE
    }

    /// Insolation on the landform's surface.
    ///
    /// With $\theta$ the signed noon zenith angle and $\beta$ the aspect-corrected slope, a
    /// slope facing the sun receives
    ///
    /// $$I_{lf} = I_{gc} \frac{\cos(|\theta| - \beta)}{\cos\theta}$$
    ///
    /// and a slope facing away
    ///
    /// $$I_{lf} = I_{gc} \frac{\cos(|\theta| + \beta)}{\cos\theta}$$
    ///
    /// or nothing at all once $|\theta| + \beta \ge 90^\circ$ and the slope shades itself.
    /// A slope faces the sun when the sun is to the south ($\theta > 0$) and the aspect lies
    /// strictly between east and west through south, or the sun is to the north and the
    /// aspect lies strictly between west and east through north. With the sun overhead every
    /// slope faces it. If `max_slope_gain` is set, the projection factor is capped at it.
    ///
    /// Insolation is returned unchanged for zero gridcell insolation, landforms without an
    /// aspect and a noon sun at or below the horizon.
    pub fn local_insolation(
        &self,
        insolation: FloatValue,
        landform: &Landform,
        day_of_year: usize,
    ) -> FloatValue {
        let Some(aspect) = landform.aspect else {
            return insolation;
        };
        if insolation == 0.0 {
            return insolation;
        }
        let zenith = noon_zenith_angle(self.latitude, day_of_year);
        if zenith.abs() >= 90.0 {
            return insolation;
        }

        let facing = if zenith > 0.0 {
            aspect > 90.0 && aspect < 270.0
        } else if zenith < 0.0 {
            aspect < 90.0 || aspect > 270.0
        } else {
            true
        };

        let slope = landform.aspect_corrected_slope;
        let projection = 1.0 / zenith.to_radians().cos();
        let gain = if facing {
            projection * (zenith.abs() - slope).to_radians().cos()
        } else if zenith.abs() + slope >= 90.0 {
            0.0
        } else {
            projection * (zenith.abs() + slope).to_radians().cos()
        };

        match self.parameters.max_slope_gain {
            Some(cap) => insolation * gain.min(cap),
            None => insolation * gain,
        }
    }

    /// Local climate of one landform.
    pub fn downscale(
        &self,
        climate: &ClimateDay,
        landform: &Landform,
        day: &SimulatedDay,
    ) -> ForcingResult<LocalClimate> {
        let insolation = self.local_insolation(climate.insolation, landform, day.day_of_year);
        if insolation.is_nan() || insolation < 0.0 {
            return Err(ForcingError::NegativeInsolation {
                landform: landform.id,
                day_of_year: day.day_of_year,
                value: insolation,
            });
        }

        Ok(LocalClimate {
            landform: landform.id,
            climate: ClimateDay {
                temperature: self.local_temperature(climate.temperature, landform),
                insolation,
                min_temperature: climate
                    .min_temperature
                    .map(|t| self.local_temperature(t, landform)),
                max_temperature: climate
                    .max_temperature
                    .map(|t| self.local_temperature(t, landform)),
                ..*climate
            },
        })
    }

    /// Local climate of every landform, in landform order.
    pub fn downscale_all(
        &self,
        climate: &ClimateDay,
        landforms: &Landforms,
        day: &SimulatedDay,
    ) -> ForcingResult<Vec<LocalClimate>> {
        landforms.iter().map(|landform| self.downscale(climate, landform, day)).collect()
    }
}
