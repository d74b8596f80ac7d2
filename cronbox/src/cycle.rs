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

use rand::Rng;
use serde::Serialize;
use std::{fmt, time::Duration};

/// Any delay of at least this many milliseconds means "run once and stay up".
pub const SINGLE_SHOT_MILLIS: u64 = i64::MAX as u64;

pub const DEFAULT_CYCLE_RANDOM: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleDelay {
    SingleShot,
    Every(Duration),
}

impl fmt::Display for CycleDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleDelay::SingleShot => write!(f, "single-shot"),
            CycleDelay::Every(delay) => write!(f, "{}ms", delay.as_millis()),
        }
    }
}

/// Base delay between two cycles plus the upper bound of the random jitter added to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleConfig {
    pub delay: CycleDelay,
    pub random: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        CycleConfig {
            delay: CycleDelay::SingleShot,
            random: DEFAULT_CYCLE_RANDOM,
        }
    }
}

impl CycleConfig {
    pub fn new(delay: CycleDelay, random: Duration) -> Self {
        CycleConfig { delay, random }
    }

    pub fn single_shot() -> Self {
        CycleConfig::default()
    }

    pub fn every(delay: Duration, random: Duration) -> Self {
        CycleConfig::new(CycleDelay::Every(delay), random)
    }

    pub fn from_millis(delay_ms: u64, random_ms: u64) -> Self {
        let delay = if delay_ms >= SINGLE_SHOT_MILLIS {
            CycleDelay::SingleShot
        } else {
            CycleDelay::Every(Duration::from_millis(delay_ms))
        };
        CycleConfig::new(delay, Duration::from_millis(random_ms))
    }

    pub fn is_single_shot(&self) -> bool {
        self.delay == CycleDelay::SingleShot
    }

    /// Sleep before the next cycle, `None` in single-shot mode.
    pub fn next_delay(&self) -> Option<Duration> {
        self.next_delay_with(&mut rand::rng())
    }

    /// Result lies in `[delay, delay + random)`, or is exactly `delay` if `random` is zero.
    pub fn next_delay_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Duration> {
        let CycleDelay::Every(delay) = self.delay else {
            return None;
        };

        let random_ms = self.random.as_millis().min(u64::MAX as u128) as u64;
        let jitter = if random_ms == 0 {
            0
        } else {
            rng.random_range(0..random_ms)
        };

        Some(delay.saturating_add(Duration::from_millis(jitter)))
    }
}

impl fmt::Display for CycleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delay {}, random {}ms", self.delay, self.random.as_millis())
    }
}
