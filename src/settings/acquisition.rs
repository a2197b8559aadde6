// SPDX-License-Identifier: GPL-3.0-or-later
use serde::de::{Deserialize, Deserializer, Error};

use std::time::Duration;

/// Longest accepted delay, to keep typos from stalling the loop for days.
const MAX_SECONDS: f64 = 3600.0;

/// Deserialize a positive number of seconds into a [Duration].
fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if secs.is_finite() && secs > 0.0 && secs <= MAX_SECONDS {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(D::Error::custom(format!(
            "expected a number of seconds greater than 0 and at most {}, got {}",
            MAX_SECONDS, secs
        )))
    }
}

#[derive(Clone, Copy, Debug, serde::Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct AcquisitionSettings {
    /// Delay after a successfully published frame. Defaults to half a second.
    #[serde(
        default = "AcquisitionSettings::default_update_interval",
        deserialize_with = "seconds"
    )]
    pub(crate) update_interval: Duration,

    /// Delay after a failed tick. Defaults to one second.
    #[serde(
        default = "AcquisitionSettings::default_error_backoff",
        deserialize_with = "seconds"
    )]
    pub(crate) error_backoff: Duration,
}

impl AcquisitionSettings {
    fn default_update_interval() -> Duration {
        Duration::from_millis(500)
    }

    fn default_error_backoff() -> Duration {
        Duration::from_secs(1)
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            update_interval: Self::default_update_interval(),
            error_backoff: Self::default_error_backoff(),
        }
    }
}
