// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;

use anyhow::Context as _;
use linux_embedded_hal::I2cdev;
use serde::Deserialize;
use tracing::debug;

use super::i2c::Bus;
use super::thermal_camera::{self, ThermalCamera};

fn default_address() -> u8 {
    0x33
}

fn default_frame_rate() -> f32 {
    4.0
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub(crate) enum SensorSettings {
    Mlx90640 {
        #[serde(default)]
        bus: Bus,

        #[serde(default = "default_address")]
        address: u8,

        /// Refresh rate requested from the camera, in Hz.
        #[serde(default = "default_frame_rate")]
        frame_rate: f32,
    },
    /// Skip the hardware entirely and generate frames.
    Synthetic,
}

impl SensorSettings {
    /// Open the configured camera. Returns `None` when no hardware camera is configured.
    pub(crate) fn create_camera(&self) -> Option<anyhow::Result<Box<dyn ThermalCamera + Send>>> {
        match self {
            Self::Mlx90640 {
                bus,
                address,
                frame_rate,
            } => Some(Self::open_mlx90640(bus, *address, *frame_rate)),
            Self::Synthetic => None,
        }
    }

    fn open_mlx90640(
        bus: &Bus,
        address: u8,
        frame_rate: f32,
    ) -> anyhow::Result<Box<dyn ThermalCamera + Send>> {
        debug!(%bus, address, frame_rate, "Opening MLX90640");
        let i2c = I2cdev::try_from(bus)
            .with_context(|| format!("Unable to connect to I2C bus {}", bus))?;
        let driver = mlx9064x::Mlx90640Driver::new(i2c, address)
            .context("Unable to initialize MLX90640 driver")?;
        let mut camera = thermal_camera::Mlx90640::new(driver)?;
        camera.set_frame_rate(frame_rate)?;
        Ok(Box::new(camera))
    }

    /// Replace the bus, if this is a hardware camera.
    pub(crate) fn set_bus(&mut self, new_bus: Bus) {
        if let Self::Mlx90640 { bus, .. } = self {
            *bus = new_bus;
        }
    }
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self::Mlx90640 {
            bus: Bus::default(),
            address: default_address(),
            frame_rate: default_frame_rate(),
        }
    }
}

#[cfg(test)]
mod de_tests {
    use std::path::PathBuf;

    use crate::camera::Bus;

    use super::SensorSettings;

    #[test]
    fn minimal_toml() {
        let parsed: SensorSettings = toml::from_str("kind = \"mlx90640\"").unwrap();
        assert_eq!(parsed, SensorSettings::default());
    }

    #[test]
    fn full_toml() {
        let source = r#"
        kind = "mlx90640"
        bus = "/dev/i2c-7"
        address = 0x34
        frame_rate = 8
        "#;
        let parsed: SensorSettings = toml::from_str(source).unwrap();
        let expected = SensorSettings::Mlx90640 {
            bus: Bus::Path(PathBuf::from("/dev/i2c-7")),
            address: 0x34,
            frame_rate: 8.0,
        };
        assert_eq!(parsed, expected);
    }

    #[test]
    fn synthetic() {
        let parsed: SensorSettings = toml::from_str("kind = \"synthetic\"").unwrap();
        assert_eq!(parsed, SensorSettings::Synthetic);
        assert!(parsed.create_camera().is_none());
    }

    #[test]
    fn error_bad_kind() {
        let source = r#"
        kind = "NotARealCamera"
        bus = 1
        "#;
        let parsed: Result<SensorSettings, _> = toml::from_str(source);
        assert!(
            parsed.is_err(),
            "Did not detect invalid camera kind in:\n{}",
            source
        );
    }

    #[test]
    fn error_address_too_large() {
        let parsed: Result<SensorSettings, _> =
            toml::from_str("kind = \"mlx90640\"\naddress = 300");
        assert!(parsed.is_err());
    }

    #[test]
    fn set_bus_only_for_hardware() {
        let mut settings = SensorSettings::default();
        settings.set_bus(Bus::Number(4));
        assert!(matches!(
            settings,
            SensorSettings::Mlx90640 {
                bus: Bus::Number(4),
                ..
            }
        ));
        let mut synthetic = SensorSettings::Synthetic;
        synthetic.set_bus(Bus::Number(4));
        assert_eq!(synthetic, SensorSettings::Synthetic);
    }
}
