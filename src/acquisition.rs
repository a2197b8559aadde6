// SPDX-License-Identifier: GPL-3.0-or-later
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::sleep as thread_sleep;

use tracing::{error, info, trace};

use crate::camera::SensorSource;
use crate::error::TickError;
use crate::frame;
use crate::settings::AcquisitionSettings;
use crate::state::{DisplaySettings, SharedThermalState, ThermalSnapshot};
use crate::util::panic_message;

/// Moves frames from a [SensorSource] into the shared state at a fixed cadence.
///
/// This runs on its own blocking thread, as the camera reads block.
pub(crate) struct AcquisitionLoop {
    source: SensorSource,
    state: SharedThermalState,
    settings: AcquisitionSettings,
}

impl AcquisitionLoop {
    pub(crate) fn new(
        source: SensorSource,
        state: SharedThermalState,
        settings: AcquisitionSettings,
    ) -> Self {
        Self {
            source,
            state,
            settings,
        }
    }

    /// Acquire, process and publish one frame.
    ///
    /// The display settings are copied once at the start, so a change made while the tick is
    /// running only affects the next one.
    pub(crate) fn tick(&mut self) -> Result<Arc<ThermalSnapshot>, TickError> {
        let display = self.state.settings();
        self.tick_with(display)
    }

    pub(crate) fn tick_with(
        &mut self,
        display: DisplaySettings,
    ) -> Result<Arc<ThermalSnapshot>, TickError> {
        let source = &mut self.source;
        let state = &self.state;
        panic::catch_unwind(AssertUnwindSafe(move || -> Result<_, TickError> {
            let raw = source.acquire(&display)?;
            let processed = frame::process(raw, display.rotation);
            Ok(state.publish(processed))
        }))
        .unwrap_or_else(|payload| Err(TickError::Unexpected(panic_message(payload.as_ref()))))
    }

    /// Publish frames until the process exits.
    ///
    /// A failed tick is logged and followed by the (longer) error backoff instead of the normal
    /// update interval.
    pub(crate) fn run(mut self) -> anyhow::Result<()> {
        info!(
            interval = ?self.settings.update_interval,
            backoff = ?self.settings.error_backoff,
            synthetic = self.source.is_fallback(),
            "Acquisition loop started"
        );
        loop {
            let delay = match self.tick() {
                Ok(snapshot) => {
                    trace!(
                        sequence = snapshot.sequence,
                        temperature = snapshot.temperature,
                        "Acquired frame"
                    );
                    self.settings.update_interval
                }
                Err(err) => {
                    error!(error = %err, "Error in acquisition loop");
                    self.settings.error_backoff
                }
            };
            thread_sleep(delay);
        }
    }
}
