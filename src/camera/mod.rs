// SPDX-License-Identifier: GPL-3.0-or-later
mod i2c;
mod settings;
mod source;
mod synthetic;
mod thermal_camera;

pub(crate) use i2c::Bus;
pub(crate) use settings::SensorSettings;
pub(crate) use source::SensorSource;

#[cfg(test)]
pub(crate) use source::test::FlakyCamera;
#[cfg(test)]
pub(crate) use synthetic::test::{in_hotspot, seeded as seeded_synthetic};
#[cfg(test)]
pub(crate) use thermal_camera::ThermalCamera;
