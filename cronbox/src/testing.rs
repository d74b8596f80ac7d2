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

use crate::Application;
use miette::{Result, miette};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub(crate) struct Probe {
    pub constructed: AtomicU64,
    pub runs: AtomicU64,
    pub stops: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    Complete,
    UntilStopped,
    Fail,
    Panic,
}

#[derive(Debug, Clone)]
pub(crate) struct MockContext {
    pub probe: Arc<Probe>,
    pub run_mode: RunMode,
    pub construct_delay: Duration,
    /// 1-based number of the construction that fails.
    pub fail_construction_on: Option<u64>,
    pub fail_stop: bool,
    /// Cancels the token once this many runs have returned.
    pub cancel_after_runs: Option<(u64, CancellationToken)>,
}

impl MockContext {
    pub fn new(run_mode: RunMode) -> Self {
        MockContext {
            probe: Arc::default(),
            run_mode,
            construct_delay: Duration::ZERO,
            fail_construction_on: None,
            fail_stop: false,
            cancel_after_runs: None,
        }
    }
}

pub(crate) struct MockApp {
    ctx: MockContext,
    instance: u64,
}

impl Application for MockApp {
    type Context = MockContext;
    type Telemetry = u64;

    async fn construct(ctx: MockContext) -> Result<Self> {
        if !ctx.construct_delay.is_zero() {
            sleep(ctx.construct_delay).await;
        }
        let instance = ctx.probe.constructed.fetch_add(1, Ordering::SeqCst) + 1;
        if ctx.fail_construction_on == Some(instance) {
            return Err(miette!("construction {instance} failed"));
        }
        Ok(MockApp { ctx, instance })
    }

    async fn run(&self, stop: CancellationToken) -> Result<()> {
        let res = match self.ctx.run_mode {
            RunMode::Complete => Ok(()),
            RunMode::UntilStopped => {
                stop.cancelled().await;
                Ok(())
            }
            RunMode::Fail => Err(miette!("mock application failed")),
            RunMode::Panic => panic!("mock application panicked"),
        };

        let runs = self.ctx.probe.runs.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, token)) = &self.ctx.cancel_after_runs {
            if runs >= *limit {
                token.cancel();
            }
        }

        res
    }

    async fn stop(&self) -> Result<()> {
        self.ctx.probe.stops.fetch_add(1, Ordering::SeqCst);
        if self.ctx.fail_stop {
            Err(miette!("mock application could not be stopped"))
        } else {
            Ok(())
        }
    }

    fn telemetry(&self) -> Option<u64> {
        Some(self.instance)
    }
}
