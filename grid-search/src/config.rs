/*
 *  Copyright (C) 2025 Michael Bachmann
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU Affero General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU Affero General Public License for more details.
 *
 *  You should have received a copy of the GNU Affero General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use cronbox::{CycleConfig, DEFAULT_CYCLE_RANDOM, SINGLE_SHOT_MILLIS};
use grid_common::{Properties, ServiceIdentity, error::ConfigResult};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

pub const CYCLE_DELAY: &str = "search.cycledelay";
pub const CYCLE_RANDOM: &str = "search.cyclerandom";
pub const TELEMETRY_INTERVAL: &str = "search.telemetryinterval";
pub const PORT: &str = "port";
pub const BIND_ADDRESS: &str = "bind.address";
pub const BACKEND_ADDRESS: &str = "grid.backend.address";
pub const BACKEND_TIMEOUT: &str = "grid.backend.timeout";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub service: ServiceIdentity,
    pub data_path: PathBuf,
    pub bind_addr: IpAddr,
    pub port: u16,
    pub backend_address: Option<String>,
    pub backend_timeout: Duration,
    pub cycle: CycleConfig,
    pub telemetry_interval: Option<Duration>,
}

impl SearchConfig {
    pub fn from_properties(
        properties: &Properties,
        service: ServiceIdentity,
        data_path: impl Into<PathBuf>,
    ) -> ConfigResult<Self> {
        let cycle = CycleConfig::from_millis(
            properties.get_u64(CYCLE_DELAY, SINGLE_SHOT_MILLIS)?,
            properties.get_u64(CYCLE_RANDOM, DEFAULT_CYCLE_RANDOM.as_millis() as u64)?,
        );

        let telemetry_interval = match properties.get_u64(TELEMETRY_INTERVAL, 0)? {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        };

        let backend_address = properties
            .get(BACKEND_ADDRESS)
            .map(str::trim)
            .filter(|it| !it.is_empty())
            .map(ToOwned::to_owned);

        Ok(SearchConfig {
            port: properties.get_u16(PORT, service.default_port)?,
            service,
            data_path: data_path.into(),
            bind_addr: properties.get_ip(BIND_ADDRESS, [0, 0, 0, 0].into())?,
            backend_address,
            backend_timeout: Duration::from_millis(properties.get_u64(BACKEND_TIMEOUT, 5_000)?),
            cycle,
            telemetry_interval,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
