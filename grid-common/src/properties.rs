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

//! Environment variables → configuration properties.
//!
//! Every variable starting with the prefix (by default [`ENV_PREFIX`]) becomes a
//! property: the prefix is stripped, `_` is replaced by `.` and the result is
//! lower-cased. Variables without the prefix are ignored.
//!
//! | Environment variable                 | Property key                 |
//! |--------------------------------------|------------------------------|
//! | `YACYGRID_SEARCH_CYCLEDELAY`         | `search.cycledelay`          |
//! | `YACYGRID_SEARCH_CYCLERANDOM`        | `search.cyclerandom`         |
//! | `YACYGRID_SEARCH_TELEMETRYINTERVAL`  | `search.telemetryinterval`   |
//! | `YACYGRID_PORT`                      | `port`                       |
//! | `YACYGRID_BIND_ADDRESS`              | `bind.address`               |
//! | `YACYGRID_GRID_BACKEND_ADDRESS`      | `grid.backend.address`       |
//! | `YACYGRID_GRID_BACKEND_TIMEOUT`      | `grid.backend.timeout`       |

use crate::error::{ConfigError, ConfigResult};
use std::{collections::BTreeMap, env, net::IpAddr, num::ParseIntError, str::FromStr};
use tracing::debug;

pub const ENV_PREFIX: &str = "YACYGRID_";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn from_env() -> Self {
        Properties::from_vars(ENV_PREFIX, env::vars())
    }

    pub fn from_vars<K, V>(prefix: &str, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut properties = Properties::default();
        for (name, value) in vars {
            if let Some(key) = property_key(prefix, name.as_ref()) {
                debug!("{} → {key}", name.as_ref());
                properties.0.insert(key, value.into());
            }
        }
        properties
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> ConfigResult<u64> {
        self.get_parsed(key, default)
    }

    pub fn get_u16(&self, key: &str, default: u16) -> ConfigResult<u16> {
        self.get_parsed(key, default)
    }

    pub fn get_ip(&self, key: &str, default: IpAddr) -> ConfigResult<IpAddr> {
        match self.get(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidAddress {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    source,
                }),
            None => Ok(default),
        }
    }

    fn get_parsed<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr<Err = ParseIntError>,
    {
        match self.get(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidInteger {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    source,
                }),
            None => Ok(default),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn property_key(prefix: &str, name: &str) -> Option<String> {
    let key = name.strip_prefix(prefix)?;
    if key.is_empty() {
        return None;
    }
    Some(key.replace('_', ".").to_lowercase())
}
