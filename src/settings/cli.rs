// SPDX-License-Identifier: GPL-3.0-or-later
use structopt::StructOpt;

use std::net::IpAddr;
use std::path::PathBuf;

use crate::camera::Bus;

#[derive(Debug, Default, StructOpt)]
#[structopt()]
pub(crate) struct Args {
    /// Path to a configuration file. Built-in defaults are used when not given.
    #[structopt(short, long, parse(from_os_str))]
    pub(crate) config_path: Option<PathBuf>,

    /// Address for the HTTP server to listen on.
    #[structopt(short, long)]
    pub(crate) address: Option<IpAddr>,

    /// Port for the HTTP server to listen on.
    #[structopt(short, long)]
    pub(crate) port: Option<u16>,

    /// I2C bus the camera is attached to, either a number or a device path.
    #[structopt(short, long)]
    pub(crate) bus: Option<Bus>,

    /// Generate simulated frames instead of opening the camera.
    #[structopt(long)]
    pub(crate) synthetic: bool,
}
