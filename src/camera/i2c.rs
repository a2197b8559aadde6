// SPDX-License-Identifier: GPL-3.0-or-later
use linux_embedded_hal::I2cdev;

use i2cdev::linux::LinuxI2CError;
use serde::Deserialize;

use std::convert::{Infallible, TryFrom};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::util::parse_int_decimal_hex;

/// An I2C bus, either by number (`/dev/i2c-N`) or by device path.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum Bus {
    Number(u32),
    Path(PathBuf),
}

impl Default for Bus {
    fn default() -> Self {
        // The header pins on a Raspberry Pi are wired to bus 1.
        Self::Number(1)
    }
}

impl From<u32> for Bus {
    fn from(bus: u32) -> Self {
        Self::Number(bus)
    }
}

impl FromStr for Bus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_int_decimal_hex(s)
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Path(PathBuf::from(s))))
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "/dev/i2c-{}", n),
            Self::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

impl TryFrom<&Bus> for I2cdev {
    type Error = LinuxI2CError;

    fn try_from(bus: &Bus) -> Result<Self, Self::Error> {
        let device_path = match bus {
            Bus::Number(n) => PathBuf::from(format!("/dev/i2c-{}", n)),
            Bus::Path(p) => p.clone(),
        };
        I2cdev::new(device_path)
    }
}
