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

//! # cronbox
//!
//! A supervisor that keeps a single long-running [`Application`] alive across
//! a configurable restart cycle and tears it down cleanly on request.
//!
//! ```text
//! loop {
//!   ├─► construct application          (failure: counted, next cycle)
//!   ├─► run(stop_token)                (until natural return or stop)
//!   ├─► stop()                         (exactly once per instance)
//!   └─► sleep(delay + rand[0, random)) (single-shot: wait for restart)
//! }
//! ```
//!
//! Termination (a cancelled [`CancellationToken`](tokio_util::sync::CancellationToken))
//! interrupts both the running application and the sleep.

mod application;
mod cycle;
mod error;
mod state;
mod stats;
mod supervisor;

#[cfg(test)]
mod testing;

pub use application::Application;
pub use cycle::{CycleConfig, CycleDelay, DEFAULT_CYCLE_RANDOM, SINGLE_SHOT_MILLIS};
pub use error::{CycleError, CycleResult};
pub use state::SupervisorState;
pub use stats::CycleStats;
pub use supervisor::{CronBox, CronBoxHandle};
