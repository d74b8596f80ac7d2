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

use miette::Diagnostic;
use std::{net::AddrParseError, num::ParseIntError};
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("invalid integer for '{key}': {value} ({source})")]
    #[diagnostic(help("the value is expected to be a non-negative integer"))]
    InvalidInteger {
        key: String,
        value: String,
        source: ParseIntError,
    },
    #[error("invalid address for '{key}': {value} ({source})")]
    InvalidAddress {
        key: String,
        value: String,
        source: AddrParseError,
    },
    #[error("logging init error: {0}")]
    Logging(#[from] TryInitError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
