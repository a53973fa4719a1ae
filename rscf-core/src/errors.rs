use thiserror::Error;

/// Error type for forcing construction and downscaling.
///
/// Variants fall into three groups:
///
/// - setup errors, raised while a gridcell's forcing pipeline is built. These abort the
///   gridcell but not a batch of independent gridcells.
/// - invariant violations, raised on the per-day path. These indicate a logic or unit error
///   upstream and abort the whole run.
/// - capability errors, raised when a feature is requested whose prerequisite inputs
///   were not supplied.
#[derive(Error, Debug)]
pub enum ForcingError {
    #[error("{0}")]
    Error(String),
    #[error("Insufficient spin-up data for {variable}: need {required} years of contiguous {resolution} data, found {available}")]
    InsufficientSpinupData {
        variable: String,
        required: usize,
        available: usize,
        resolution: String,
    },
    #[error("Wrong input units for {variable}. Expected one of {expected}, got {found}")]
    WrongUnits {
        variable: String,
        expected: String,
        found: String,
    },
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("Wrong standard name for {variable}. Expected {expected}, got {found}")]
    WrongStandardName {
        variable: String,
        expected: String,
        found: String,
    },
    #[error("Sources {first} and {second} are incompatible: {reason}")]
    IncompatibleSources {
        first: String,
        second: String,
        reason: String,
    },
    #[error("Unsupported calendar type '{0}'")]
    UnsupportedCalendar(String),
    #[error("Invalid landform classification: {0}")]
    InvalidLandforms(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Negative insolation {value} for landform {landform} on day {day_of_year}")]
    NegativeInsolation {
        landform: u32,
        day_of_year: usize,
        value: f64,
    },
    #[error("{feature} requires {missing}, which was not supplied")]
    MissingCapability { feature: String, missing: String },
    #[error("Checkpoint does not match the gridcell: {0}")]
    CheckpointMismatch(String),
    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ForcingError {
    /// Whether the error must abort the whole run rather than a single gridcell.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, ForcingError::NegativeInsolation { .. })
    }
}

/// Convenience type for `Result<T, ForcingError>`.
pub type ForcingResult<T> = Result<T, ForcingError>;
