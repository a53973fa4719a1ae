mod landform;
mod ndep;
mod precipitation;
pub mod solar;

pub use landform::{
    AspectClass, ClimateDay, Downscaler, DownscalingParameters, Landform, LandformRecord, Landforms,
    LocalClimate, SlopeClass, NO_ASPECT, REFERENCE_LANDFORM, TEMP_LAPSE_RATE,
};
pub use ndep::{
    distribute as distribute_ndep, monthly_from_annual as ndep_monthly_from_annual, G_TO_KG,
};
pub use precipitation::{PrecipitationGenerator, PrecipitationParameters};
