// SPDX-License-Identifier: GPL-3.0-or-later
use serde::Deserialize;

use std::net;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServerSettings {
    /// The address to bind the server to. Defaults to `0.0.0.0`.
    #[serde(default = "ServerSettings::default_address")]
    pub(crate) address: net::IpAddr,

    /// The port to bind the server to. Default to `5000`.
    #[serde(default = "ServerSettings::default_port")]
    pub(crate) port: u16,
}

impl ServerSettings {
    fn default_address() -> net::IpAddr {
        net::IpAddr::from([0u8, 0u8, 0u8, 0u8])
    }

    fn default_port() -> u16 {
        5000u16
    }
}

impl From<ServerSettings> for net::SocketAddr {
    fn from(settings: ServerSettings) -> Self {
        net::SocketAddr::new(settings.address, settings.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
            port: Self::default_port(),
        }
    }
}
