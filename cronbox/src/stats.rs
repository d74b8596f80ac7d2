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

use crate::error::CycleError;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    /// Cycles that entered `Starting`.
    pub cycles: u64,
    /// Cycles whose instance was constructed, run and stopped without any failure.
    pub completed: u64,
    pub construction_failures: u64,
    pub runtime_failures: u64,
    pub shutdown_failures: u64,
    /// Explicit restart requests that were honored.
    pub restarts: u64,
    pub last_error: Option<String>,
}

impl CycleStats {
    pub fn failures(&self) -> u64 {
        self.construction_failures + self.runtime_failures + self.shutdown_failures
    }

    pub(crate) fn record_failure(&mut self, error: &CycleError) {
        match error {
            CycleError::Construction { .. } => self.construction_failures += 1,
            CycleError::Runtime { .. } => self.runtime_failures += 1,
            CycleError::Shutdown { .. } => self.shutdown_failures += 1,
        }
        self.last_error = Some(error.to_string());
    }
}
