// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Context as _;
use serde::Deserialize;
use tracing::debug;

use std::fs;
use std::path::Path;

mod acquisition;
mod cli;
mod server;

use crate::camera::SensorSettings;
use crate::state::DisplaySettings;
pub(crate) use acquisition::AcquisitionSettings;
pub(crate) use cli::Args;
pub(crate) use server::ServerSettings;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct Settings {
    /// Which sensor to read frames from.
    #[serde(default)]
    pub(crate) sensor: SensorSettings,

    /// The display settings in effect at startup.
    #[serde(default)]
    pub(crate) display: DisplaySettings,

    /// Frame timing.
    #[serde(default)]
    pub(crate) acquisition: AcquisitionSettings,

    /// Settings for the HTTP server.
    #[serde(default)]
    pub(crate) server: ServerSettings,
}

impl Settings {
    pub(crate) fn from_path(path: &Path) -> anyhow::Result<Self> {
        let config_data = fs::read_to_string(path)
            .with_context(|| format!("Unable to read configuration file {}", path.display()))?;
        toml::from_str(&config_data)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load the configuration file (if any) and apply command line overrides on top of it.
    pub(crate) fn from_args(args: Args) -> anyhow::Result<Self> {
        let mut settings = match &args.config_path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        if let Some(address) = args.address {
            settings.server.address = address;
        }
        if let Some(port) = args.port {
            settings.server.port = port;
        }
        if let Some(bus) = args.bus {
            settings.sensor.set_bus(bus);
        }
        if args.synthetic {
            settings.sensor = SensorSettings::Synthetic;
        }
        settings
            .display
            .validate()
            .context("Invalid display settings")?;
        debug!(?settings, "Loaded settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use std::net::IpAddr;

    use tempfile::NamedTempFile;

    use crate::camera::{Bus, SensorSettings};
    use crate::frame::Rotation;

    use super::{Args, Settings};

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn no_config_file() {
        let settings = Settings::from_args(Args::default()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn full_config_file() {
        let file = config_file(
            r#"
            [sensor]
            kind = "mlx90640"
            bus = 0
            address = 0x33
            frame_rate = 2

            [display]
            min_temp = 18.0
            max_temp = 38.0
            rotation = 1

            [acquisition]
            update_interval = 0.25

            [server]
            port = 8080
            "#,
        );
        let args = Args {
            config_path: Some(file.path().to_path_buf()),
            ..Args::default()
        };
        let settings = Settings::from_args(args).unwrap();
        assert_eq!(
            settings.sensor,
            SensorSettings::Mlx90640 {
                bus: Bus::Number(0),
                address: 0x33,
                frame_rate: 2.0,
            }
        );
        assert_eq!(settings.display.min_temp, 18.0);
        assert_eq!(settings.display.rotation, Rotation::Ninety);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn cli_overrides_file() {
        let file = config_file("[server]\nport = 8080\naddress = \"127.0.0.1\"\n");
        let args = Args {
            config_path: Some(file.path().to_path_buf()),
            port: Some(9090),
            bus: Some(Bus::Number(3)),
            synthetic: false,
            ..Args::default()
        };
        let settings = Settings::from_args(args).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.address, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert!(matches!(
            settings.sensor,
            SensorSettings::Mlx90640 {
                bus: Bus::Number(3),
                ..
            }
        ));
    }

    #[test]
    fn synthetic_flag() {
        let args = Args {
            synthetic: true,
            ..Args::default()
        };
        let settings = Settings::from_args(args).unwrap();
        assert_eq!(settings.sensor, SensorSettings::Synthetic);
    }

    #[test]
    fn inverted_display_range() {
        let file = config_file("[display]\nmin_temp = 40.0\nmax_temp = 20.0\n");
        let args = Args {
            config_path: Some(file.path().to_path_buf()),
            ..Args::default()
        };
        assert!(Settings::from_args(args).is_err());
    }

    #[test]
    fn unknown_section() {
        let file = config_file("[mqtt]\nserver = \"localhost\"\n");
        assert!(Settings::from_path(file.path()).is_err());
    }

    #[test]
    fn missing_file() {
        let args = Args {
            config_path: Some("/nonexistent/thermal-viewer.toml".into()),
            ..Args::default()
        };
        assert!(Settings::from_args(args).is_err());
    }
}
