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
use std::fmt;
use thiserror::Error;

/// A failed cycle. None of these ever leave the supervisor loop, they are logged and counted.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("cycle {cycle}: application could not be constructed: {detail}")]
    #[diagnostic(code(cronbox::construction))]
    Construction { cycle: u64, detail: String },
    #[error("cycle {cycle}: application failed while running: {detail}")]
    #[diagnostic(code(cronbox::runtime))]
    Runtime { cycle: u64, detail: String },
    #[error("cycle {cycle}: application could not be stopped cleanly: {detail}")]
    #[diagnostic(code(cronbox::shutdown))]
    Shutdown { cycle: u64, detail: String },
}

impl CycleError {
    pub fn construction(cycle: u64, detail: impl fmt::Display) -> Self {
        CycleError::Construction {
            cycle,
            detail: detail.to_string(),
        }
    }

    pub fn runtime(cycle: u64, detail: impl fmt::Display) -> Self {
        CycleError::Runtime {
            cycle,
            detail: detail.to_string(),
        }
    }

    pub fn shutdown(cycle: u64, detail: impl fmt::Display) -> Self {
        CycleError::Shutdown {
            cycle,
            detail: detail.to_string(),
        }
    }

    pub fn cycle(&self) -> u64 {
        match self {
            CycleError::Construction { cycle, .. }
            | CycleError::Runtime { cycle, .. }
            | CycleError::Shutdown { cycle, .. } => *cycle,
        }
    }
}

pub type CycleResult<T> = Result<T, CycleError>;

/// Flattens a report and all of its causes into a single log line.
pub(crate) fn report_detail(report: &miette::Report) -> String {
    report
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked with a non-string payload".to_owned()
    }
}
