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

use crate::error::{CycleError, CycleResult, panic_message, report_detail};
use futures::FutureExt;
use miette::Result;
use std::{
    fmt,
    future::Future,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A unit of work supervised by a [`CronBox`](crate::CronBox).
///
/// All heavyweight setup (listeners, backend connections, …) belongs into
/// [`construct`](Application::construct), so that a broken setup fails the
/// cycle before anything is run.
///
/// [`run`](Application::run) is handed a [`CancellationToken`] that gets
/// cancelled when the supervisor wants the instance to wind down. The
/// implementation must observe it and return. An instance that never returns
/// from `run` after its token was cancelled blocks its supervisor forever.
///
/// [`stop`](Application::stop) tears down everything the instance owns. The
/// supervisor calls it exactly once per instance, after `run` returned or
/// instead of `run` if termination was requested during construction.
/// Implementations should nonetheless tolerate repeated calls.
pub trait Application: Sized + Send + Sync + 'static {
    /// Opaque input handed to every construction.
    type Context: Clone + Send + Sync + 'static;
    type Telemetry: Clone + fmt::Debug + Send + 'static;

    fn construct(context: Self::Context) -> impl Future<Output = Result<Self>> + Send;

    fn run(&self, stop: CancellationToken) -> impl Future<Output = Result<()>> + Send;

    fn stop(&self) -> impl Future<Output = Result<()>> + Send;

    /// Must neither block nor fail. `None` means there is nothing to report.
    fn telemetry(&self) -> Option<Self::Telemetry> {
        None
    }
}

/// The one live instance of a cycle together with its stop channel.
pub(crate) struct ApplicationHandle<A: Application> {
    app: A,
    cycle: u64,
    stop_token: CancellationToken,
    running: AtomicBool,
    stopping: AtomicBool,
}

impl<A: Application> ApplicationHandle<A> {
    pub(crate) async fn construct(context: A::Context, cycle: u64) -> CycleResult<Self> {
        match AssertUnwindSafe(A::construct(context)).catch_unwind().await {
            Ok(Ok(app)) => Ok(ApplicationHandle {
                app,
                cycle,
                stop_token: CancellationToken::new(),
                running: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
            }),
            Ok(Err(e)) => Err(CycleError::construction(cycle, report_detail(&e))),
            Err(panic) => Err(CycleError::construction(cycle, panic_message(&*panic))),
        }
    }

    pub(crate) async fn run(&self) -> CycleResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(CycleError::runtime(
                self.cycle,
                "instance has already been run",
            ));
        }

        match AssertUnwindSafe(self.app.run(self.stop_token.clone()))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CycleError::runtime(self.cycle, report_detail(&e))),
            Err(panic) => Err(CycleError::runtime(self.cycle, panic_message(&*panic))),
        }
    }

    /// Signals the running instance to wind down. Can be called any number of times.
    pub(crate) fn request_stop(&self) {
        self.stop_token.cancel();
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_token.is_cancelled()
    }

    /// Returns `Ok(false)` if the instance had already been stopped before.
    pub(crate) async fn stop(&self) -> CycleResult<bool> {
        if self
            .stopping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Instance of cycle {} is already stopping.", self.cycle);
            return Ok(false);
        }

        self.stop_token.cancel();

        match AssertUnwindSafe(self.app.stop()).catch_unwind().await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) => Err(CycleError::shutdown(self.cycle, report_detail(&e))),
            Err(panic) => Err(CycleError::shutdown(self.cycle, panic_message(&*panic))),
        }
    }

    pub(crate) fn telemetry(&self) -> Option<A::Telemetry> {
        match catch_unwind(AssertUnwindSafe(|| self.app.telemetry())) {
            Ok(telemetry) => telemetry,
            Err(panic) => {
                warn!(
                    "Telemetry of cycle {} not available: {}",
                    self.cycle,
                    panic_message(&*panic)
                );
                None
            }
        }
    }
}
