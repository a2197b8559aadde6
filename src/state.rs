// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::SettingsError;
use crate::frame::{ProcessedFrame, Rotation};

/// How frames are oriented and what temperature range viewers should map their colors to.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct DisplaySettings {
    #[serde(default = "DisplaySettings::default_min_temp")]
    pub(crate) min_temp: f32,

    #[serde(default = "DisplaySettings::default_max_temp")]
    pub(crate) max_temp: f32,

    #[serde(default)]
    pub(crate) rotation: Rotation,
}

impl DisplaySettings {
    fn default_min_temp() -> f32 {
        20.0
    }

    fn default_max_temp() -> f32 {
        40.0
    }

    /// Check that the temperature range is usable.
    pub(crate) fn validate(&self) -> Result<(), SettingsError> {
        if !self.min_temp.is_finite() {
            return Err(SettingsError::NonFinite("min_temp"));
        }
        if !self.max_temp.is_finite() {
            return Err(SettingsError::NonFinite("max_temp"));
        }
        if self.min_temp >= self.max_temp {
            return Err(SettingsError::InvalidRange {
                min_temp: self.min_temp,
                max_temp: self.max_temp,
            });
        }
        Ok(())
    }

    /// Apply the fields present in `update`, leaving the others alone.
    pub(crate) fn merged(&self, update: &SettingsUpdate) -> Self {
        Self {
            min_temp: update.min_temp.unwrap_or(self.min_temp),
            max_temp: update.max_temp.unwrap_or(self.max_temp),
            rotation: update.rotation.unwrap_or(self.rotation),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            min_temp: Self::default_min_temp(),
            max_temp: Self::default_max_temp(),
            rotation: Rotation::default(),
        }
    }
}

/// A partial [`DisplaySettings`], as submitted by clients.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub(crate) struct SettingsUpdate {
    #[serde(default)]
    pub(crate) min_temp: Option<f32>,

    #[serde(default)]
    pub(crate) max_temp: Option<f32>,

    #[serde(default)]
    pub(crate) rotation: Option<Rotation>,
}

impl SettingsUpdate {
    /// Parse a JSON object. Arrays are refused, even though serde would map them onto the fields
    /// by position.
    pub(crate) fn from_json(body: &[u8]) -> Result<Self, SettingsError> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(SettingsError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// The most recently published thermal state.
///
/// Snapshots are never modified once created; a new one replaces the old one whole.
#[derive(Clone, Debug)]
pub(crate) struct ThermalSnapshot {
    /// The hottest reading of `image`, or 0 before the first frame.
    pub(crate) temperature: f32,
    pub(crate) min_temp: f32,
    pub(crate) max_temp: f32,
    pub(crate) image: Option<Arc<ProcessedFrame>>,
    pub(crate) timestamp: SystemTime,
    /// Incremented on every published frame, starting from 0 for the empty initial snapshot.
    pub(crate) sequence: u64,
}

impl ThermalSnapshot {
    fn initial(settings: &DisplaySettings) -> Self {
        Self {
            temperature: 0.0,
            min_temp: settings.min_temp,
            max_temp: settings.max_temp,
            image: None,
            timestamp: SystemTime::now(),
            sequence: 0,
        }
    }

    /// The coldest value in the image, if there is one.
    pub(crate) fn min_displayed(&self) -> Option<f32> {
        self.image.as_ref().map(|image| image.min_temperature())
    }
}

#[derive(Debug)]
struct Inner {
    settings: DisplaySettings,
    snapshot: Arc<ThermalSnapshot>,
}

/// Handle to the state shared between the acquisition loop and the HTTP handlers.
///
/// Cloning the handle is cheap, and every clone refers to the same state.
#[derive(Clone, Debug)]
pub(crate) struct SharedThermalState {
    inner: Arc<RwLock<Inner>>,
}

impl SharedThermalState {
    pub(crate) fn new(settings: DisplaySettings) -> Self {
        let snapshot = Arc::new(ThermalSnapshot::initial(&settings));
        Self {
            inner: Arc::new(RwLock::new(Inner { settings, snapshot })),
        }
    }

    /// The current snapshot.
    pub(crate) fn read(&self) -> Arc<ThermalSnapshot> {
        Arc::clone(&self.inner.read().snapshot)
    }

    /// A copy of the current display settings.
    pub(crate) fn settings(&self) -> DisplaySettings {
        self.inner.read().settings
    }

    /// Replace the snapshot with one built around `frame`.
    ///
    /// The temperature bounds are taken from the settings as they are now, not as they were when
    /// the frame was captured.
    pub(crate) fn publish(&self, frame: ProcessedFrame) -> Arc<ThermalSnapshot> {
        let temperature = frame.max_temperature;
        let image = Some(Arc::new(frame));
        let mut inner = self.inner.write();
        let snapshot = Arc::new(ThermalSnapshot {
            temperature,
            min_temp: inner.settings.min_temp,
            max_temp: inner.settings.max_temp,
            image,
            timestamp: SystemTime::now(),
            sequence: inner.snapshot.sequence + 1,
        });
        inner.snapshot = Arc::clone(&snapshot);
        drop(inner);
        trace!(sequence = snapshot.sequence, temperature, "Published snapshot");
        snapshot
    }

    /// Merge `update` into the display settings.
    ///
    /// Nothing changes if the merged settings are invalid. A new rotation is only used by frames
    /// processed after this returns.
    pub(crate) fn update_settings(
        &self,
        update: SettingsUpdate,
    ) -> Result<DisplaySettings, SettingsError> {
        let mut inner = self.inner.write();
        let merged = inner.settings.merged(&update);
        merged.validate()?;
        let range_changed = merged.min_temp != inner.settings.min_temp
            || merged.max_temp != inner.settings.max_temp;
        inner.settings = merged;
        if range_changed {
            // Keep the frame, swap in the new bounds so readers see them right away.
            let snapshot = ThermalSnapshot {
                min_temp: merged.min_temp,
                max_temp: merged.max_temp,
                ..ThermalSnapshot::clone(&inner.snapshot)
            };
            inner.snapshot = Arc::new(snapshot);
        }
        drop(inner);
        debug!(settings = ?merged, "Updated display settings");
        Ok(merged)
    }
}

impl Default for SharedThermalState {
    fn default() -> Self {
        Self::new(DisplaySettings::default())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    use crate::error::SettingsError;
    use crate::frame::{process, RawFrame, Rotation, COLS, ROWS};

    use super::{DisplaySettings, SettingsUpdate, SharedThermalState};

    fn flat_frame(value: f32, rotation: Rotation) -> crate::frame::ProcessedFrame {
        process(
            RawFrame::from_fn(|_| value),
            rotation,
        )
    }

    #[test]
    fn initial_snapshot_is_empty() {
        let state = SharedThermalState::default();
        let snapshot = state.read();
        assert!(snapshot.image.is_none());
        assert_eq!(snapshot.temperature, 0.0);
        assert_eq!(snapshot.min_temp, 20.0);
        assert_eq!(snapshot.max_temp, 40.0);
        assert_eq!(snapshot.sequence, 0);
        assert_eq!(snapshot.min_displayed(), None);
        assert_eq!(state.settings().rotation, Rotation::TwoSeventy);
    }

    #[test]
    fn publish_replaces_snapshot() {
        let state = SharedThermalState::default();
        let before = state.read();
        let published = state.publish(flat_frame(31.0, Rotation::Zero));
        let after = state.read();
        assert!(Arc::ptr_eq(&published, &after));
        assert_eq!(after.sequence, 1);
        assert_eq!(after.temperature, 31.0);
        assert_eq!(after.min_displayed(), Some(31.0));
        assert!(after.timestamp >= before.timestamp);
        // The old snapshot handed out earlier is untouched.
        assert!(before.image.is_none());
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let state = SharedThermalState::default();
        let update = SettingsUpdate {
            min_temp: Some(10.0),
            ..SettingsUpdate::default()
        };
        let merged = state.update_settings(update).unwrap();
        assert_eq!(
            merged,
            DisplaySettings {
                min_temp: 10.0,
                max_temp: 40.0,
                rotation: Rotation::TwoSeventy,
            }
        );
        // Readers see the new bound before the next frame is published.
        assert_eq!(state.read().min_temp, 10.0);
        assert_eq!(state.read().max_temp, 40.0);
    }

    #[test]
    fn rotation_update_does_not_touch_published_image() {
        let state = SharedThermalState::default();
        state.publish(flat_frame(25.0, Rotation::TwoSeventy));
        let update = SettingsUpdate {
            rotation: Some(Rotation::OneEighty),
            ..SettingsUpdate::default()
        };
        state.update_settings(update).unwrap();
        let snapshot = state.read();
        let image = snapshot.image.as_ref().unwrap();
        assert_eq!(image.rotation, Rotation::TwoSeventy);
        assert_eq!(image.grid.dim(), (COLS, ROWS));
        assert_eq!(state.settings().rotation, Rotation::OneEighty);
    }

    #[test]
    fn publish_copies_current_bounds() {
        let state = SharedThermalState::default();
        state
            .update_settings(SettingsUpdate {
                min_temp: Some(15.0),
                max_temp: Some(45.0),
                rotation: None,
            })
            .unwrap();
        let snapshot = state.publish(flat_frame(30.0, Rotation::Zero));
        assert_eq!(snapshot.min_temp, 15.0);
        assert_eq!(snapshot.max_temp, 45.0);
    }

    #[test]
    fn inverted_range_rejected() {
        let state = SharedThermalState::default();
        let result = state.update_settings(SettingsUpdate {
            min_temp: Some(50.0),
            ..SettingsUpdate::default()
        });
        assert!(matches!(result, Err(SettingsError::InvalidRange { .. })));
        assert_eq!(state.settings(), DisplaySettings::default());
        assert_eq!(state.read().min_temp, 20.0);
    }

    #[test]
    fn non_finite_rejected() {
        let state = SharedThermalState::default();
        let result = state.update_settings(SettingsUpdate {
            max_temp: Some(f32::INFINITY),
            ..SettingsUpdate::default()
        });
        assert!(matches!(result, Err(SettingsError::NonFinite("max_temp"))));
        assert_eq!(state.settings(), DisplaySettings::default());
    }

    #[test]
    fn update_from_json() {
        let update = SettingsUpdate::from_json(br#"{"rotation": 2, "colormap": "jet"}"#).unwrap();
        assert_eq!(
            update,
            SettingsUpdate {
                rotation: Some(Rotation::OneEighty),
                ..SettingsUpdate::default()
            }
        );
        assert!(matches!(
            SettingsUpdate::from_json(br#"{"rotation": 5}"#),
            Err(SettingsError::Malformed(_))
        ));
        assert!(matches!(
            SettingsUpdate::from_json(br#"{"min_temp": "cold"}"#),
            Err(SettingsError::Malformed(_))
        ));
        assert!(SettingsUpdate::from_json(b"not json").is_err());
    }

    #[test]
    fn update_must_be_an_object() {
        let bodies: [&[u8]; 5] = [b"[1, 2, 3]", b"[]", b"null", b"3", br#""rotation""#];
        for body in bodies.iter() {
            assert!(
                matches!(
                    SettingsUpdate::from_json(body),
                    Err(SettingsError::NotAnObject)
                ),
                "accepted {:?}",
                String::from_utf8_lossy(body)
            );
        }
        assert_eq!(
            SettingsUpdate::from_json(b"{}").unwrap(),
            SettingsUpdate::default()
        );
    }

    #[test]
    fn positional_update_leaves_state_alone() {
        let state = SharedThermalState::default();
        let result =
            SettingsUpdate::from_json(b"[1, 2, 3]").and_then(|update| state.update_settings(update));
        assert!(result.is_err());
        assert_eq!(state.settings(), DisplaySettings::default());
        assert_eq!(state.read().min_temp, 20.0);
    }

    #[test]
    fn display_settings_toml() {
        let parsed: DisplaySettings = toml::from_str("").unwrap();
        assert_eq!(parsed, DisplaySettings::default());
        let parsed: DisplaySettings = toml::from_str("max_temp = 35.5\nrotation = 0").unwrap();
        assert_eq!(parsed.max_temp, 35.5);
        assert_eq!(parsed.rotation, Rotation::Zero);
        assert!(toml::from_str::<DisplaySettings>("rotation = 7").is_err());
    }

    /// Readers racing a publisher must only ever see snapshots that were published whole.
    #[test]
    fn no_torn_reads() {
        const PUBLISHES: usize = 2000;
        const READERS: usize = 4;
        let state = SharedThermalState::default();
        let published = Arc::new(Mutex::new(HashMap::new()));
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let state = state.clone();
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut observed = Vec::new();
                    while !done.load(Ordering::Acquire) {
                        let snapshot = state.read();
                        if let Some(image) = &snapshot.image {
                            // Each frame is filled with one value, so every cell has to agree with
                            // the snapshot's temperature.
                            assert!(image.grid.iter().all(|v| *v == snapshot.temperature));
                            assert_eq!(image.grid.dim(), image.rotation.rotated_dim());
                            observed.push((
                                snapshot.sequence,
                                snapshot.temperature,
                                snapshot.timestamp,
                            ));
                        }
                    }
                    observed
                })
            })
            .collect();

        for n in 0..PUBLISHES {
            let rotation = Rotation::ALL[n % 4];
            let snapshot = state.publish(flat_frame(n as f32, rotation));
            published.lock().unwrap().insert(
                snapshot.sequence,
                (snapshot.temperature, snapshot.timestamp),
            );
        }
        done.store(true, Ordering::Release);

        let published = published.lock().unwrap();
        for reader in readers {
            for (sequence, temperature, timestamp) in reader.join().unwrap() {
                let expected = published
                    .get(&sequence)
                    .expect("observed a snapshot that was never published");
                assert_eq!(*expected, (temperature, timestamp));
            }
        }
    }
}
