// SPDX-License-Identifier: GPL-3.0-or-later
use tracing::{info, warn};

use crate::error::SensorError;
use crate::frame::RawFrame;
use crate::state::DisplaySettings;

use super::settings::SensorSettings;
use super::synthetic::SyntheticCamera;
use super::thermal_camera::ThermalCamera;

type BoxedCamera = Box<dyn ThermalCamera + Send>;

enum Mode {
    Hardware(BoxedCamera),
    /// Synthetic frames only. Once entered, this mode is never left.
    Fallback,
}

/// Where the acquisition loop gets its frames from.
///
/// Frames come from the hardware camera until it fails once, after which the source only produces
/// synthetic frames for the rest of the process lifetime.
pub(crate) struct SensorSource {
    mode: Mode,
    synthetic: SyntheticCamera,
}

impl SensorSource {
    /// Open the camera described by `settings`, falling back to synthetic frames if that fails.
    pub(crate) fn from_settings(settings: &SensorSettings) -> Self {
        match settings.create_camera() {
            None => {
                info!("Synthetic sensor requested, not opening a camera");
                Self::fallback(SyntheticCamera::new())
            }
            Some(camera) => Self::new(camera.map_err(SensorError::Init), SyntheticCamera::new()),
        }
    }

    /// Use `camera` if it was created successfully, otherwise start in fallback mode.
    pub(crate) fn new(camera: Result<BoxedCamera, SensorError>, synthetic: SyntheticCamera) -> Self {
        let mode = match camera {
            Ok(camera) => {
                info!("Thermal sensor initialized");
                Mode::Hardware(camera)
            }
            Err(err) => {
                warn!(error = %err, "Could not initialize sensor, using simulated data");
                Mode::Fallback
            }
        };
        Self { mode, synthetic }
    }

    pub(crate) fn fallback(synthetic: SyntheticCamera) -> Self {
        Self {
            mode: Mode::Fallback,
            synthetic,
        }
    }

    pub(crate) fn is_fallback(&self) -> bool {
        matches!(self.mode, Mode::Fallback)
    }

    /// Get the next frame.
    ///
    /// A hardware failure is returned to the caller and moves the source to fallback mode, so the
    /// next call produces a synthetic frame. `settings` only matters for synthetic frames.
    pub(crate) fn acquire(&mut self, settings: &DisplaySettings) -> Result<RawFrame, SensorError> {
        match &mut self.mode {
            Mode::Hardware(camera) => match camera.thermal_image() {
                Ok(frame) => Ok(frame),
                Err(err) => {
                    warn!("Sensor read failed, switching to simulated data");
                    self.mode = Mode::Fallback;
                    Err(SensorError::Read(err))
                }
            },
            Mode::Fallback => Ok(self.synthetic.frame(settings)),
        }
    }
}
