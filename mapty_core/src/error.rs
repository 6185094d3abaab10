//! Error types for the mapty_core library.

use std::fmt;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mapty_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Form input rejected before a workout was built
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Current position could not be acquired
    #[error("Geolocation error: {0}")]
    Geolocation(String),

    /// Map could not be initialized
    #[error("Map initialization error: {0}")]
    MapInit(String),

    /// A persisted entry could not be decoded
    #[error("Corrupted storage entry {key}: {reason}")]
    StorageCorruption { key: String, reason: String },

    /// Key-value storage unavailable
    #[error("Storage error: {0}")]
    Storage(String),

    /// A workout with this id is already in the store
    #[error("Duplicate workout id: {0}")]
    DuplicateWorkout(String),

    /// Latitude/longitude out of range or unparsable
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Form field a validation error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    Distance,
    Duration,
    Cadence,
    Elevation,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::Distance => "distance",
            FormField::Duration => "duration",
            FormField::Cadence => "cadence",
            FormField::Elevation => "elevation",
        };
        f.write_str(name)
    }
}

/// Why a form submission was rejected
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is not a finite number")]
    NotANumber(FormField),

    #[error("{0} must be greater than zero")]
    NotPositive(FormField),
}
