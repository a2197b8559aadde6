// SPDX-License-Identifier: GPL-3.0-or-later
use std::error::Error as StdError;
use std::fmt;

/// Failures from the thermal sensor.
#[derive(Debug)]
pub(crate) enum SensorError {
    /// The bus or the driver could not be set up.
    Init(anyhow::Error),
    /// A single frame could not be read.
    Read(anyhow::Error),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "unable to initialize thermal sensor: {:#}", e),
            Self::Read(e) => write!(f, "unable to read frame from thermal sensor: {:#}", e),
        }
    }
}

impl StdError for SensorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Init(e) => Some(e.as_ref()),
            Self::Read(e) => Some(e.as_ref()),
        }
    }
}

/// Reasons a display settings update is refused.
#[derive(Debug)]
pub(crate) enum SettingsError {
    /// The payload was not valid JSON, or a field had the wrong type or an out-of-range value.
    Malformed(serde_json::Error),
    /// The payload was valid JSON but not an object.
    NotAnObject,
    /// A temperature was infinite or NaN.
    NonFinite(&'static str),
    /// The resulting minimum is not below the resulting maximum.
    InvalidRange { min_temp: f32, max_temp: f32 },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "invalid settings payload: {}", e),
            Self::NotAnObject => write!(f, "settings payload must be a JSON object"),
            Self::NonFinite(field) => write!(f, "{} must be a finite number", field),
            Self::InvalidRange { min_temp, max_temp } => write!(
                f,
                "min_temp ({}) must be less than max_temp ({})",
                min_temp, max_temp
            ),
        }
    }
}

impl StdError for SettingsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e)
    }
}

/// Why a single acquisition tick did not publish a frame.
#[derive(Debug)]
pub(crate) enum TickError {
    Sensor(SensorError),
    /// Something panicked inside the tick. The payload message is kept if there was one.
    Unexpected(String),
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "{}", e),
            Self::Unexpected(msg) => write!(f, "unexpected failure in acquisition tick: {}", msg),
        }
    }
}

impl StdError for TickError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Sensor(e) => Some(e),
            Self::Unexpected(_) => None,
        }
    }
}

impl From<SensorError> for TickError {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}
