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

use crate::{
    Application, CycleConfig, CycleError, CycleStats, SupervisorState,
    application::ApplicationHandle,
};
use std::{future::pending, ops::ControlFlow, pin::pin};
use tokio::{
    select,
    sync::{mpsc, oneshot, watch},
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

enum CronBoxMessage<T> {
    Restart,
    Telemetry(oneshot::Sender<Option<T>>),
    Stats(oneshot::Sender<CycleStats>),
}

/// Keeps one [`Application`] alive, cycle after cycle, until it is terminated.
///
/// ```text
/// Idle ─► Starting ─► Running ─► Stopping ─► CycleWaiting ─► Starting ─► …
///            │                      ▲             │
///            └── construction ──────┼─────────────┘ (failed cycle)
///                failed             │
///            termination during ────┘
///            construction
/// ```
///
/// Termination is possible from every state. It skips any remaining sleep,
/// stops the live instance (if there is one) and ends the loop.
pub struct CronBox<A: Application> {
    name: String,
    cycle_config: CycleConfig,
    context: A::Context,
    terminate: CancellationToken,
    api_rx: mpsc::Receiver<CronBoxMessage<A::Telemetry>>,
    state_tx: watch::Sender<SupervisorState>,
    stats: CycleStats,
    restart_requested: bool,
}

/// Cheap, cloneable remote control for a running [`CronBox`].
pub struct CronBoxHandle<T> {
    api_tx: mpsc::Sender<CronBoxMessage<T>>,
    state_rx: watch::Receiver<SupervisorState>,
    terminate: CancellationToken,
}

impl<T> Clone for CronBoxHandle<T> {
    fn clone(&self) -> Self {
        CronBoxHandle {
            api_tx: self.api_tx.clone(),
            state_rx: self.state_rx.clone(),
            terminate: self.terminate.clone(),
        }
    }
}

impl<A: Application> CronBox<A> {
    /// `name` identifies the supervised service in logs. Cancelling `terminate`
    /// (or calling [`CronBoxHandle::terminate`]) ends the loop.
    pub fn new(
        name: impl Into<String>,
        cycle_config: CycleConfig,
        context: A::Context,
        terminate: CancellationToken,
    ) -> (Self, CronBoxHandle<A::Telemetry>) {
        let (api_tx, api_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(SupervisorState::Idle);

        let cron = CronBox {
            name: name.into(),
            cycle_config,
            context,
            terminate: terminate.clone(),
            api_rx,
            state_tx,
            stats: CycleStats::default(),
            restart_requested: false,
        };

        let handle = CronBoxHandle {
            api_tx,
            state_rx,
            terminate,
        };

        (cron, handle)
    }

    /// Runs cycles until termination and returns the final statistics.
    #[instrument(skip(self), fields(service = %self.name))]
    pub async fn cycle(mut self) -> CycleStats {
        info!("Supervising {} ({}) …", self.name, self.cycle_config);

        while !self.terminate.is_cancelled() {
            self.restart_requested = false;
            self.stats.cycles += 1;
            let cycle = self.stats.cycles;

            self.run_cycle(cycle).await;

            if let ControlFlow::Break(()) = self.wait_for_next_cycle().await {
                break;
            }
        }

        self.set_state(SupervisorState::Terminated);
        info!(
            "{} terminated after {} cycle(s), {} failure(s).",
            self.name,
            self.stats.cycles,
            self.stats.failures()
        );

        self.stats
    }

    async fn run_cycle(&mut self, cycle: u64) {
        self.set_state(SupervisorState::Starting);
        info!("Starting cycle {cycle} …");

        let app = match ApplicationHandle::<A>::construct(self.context.clone(), cycle).await {
            Ok(it) => it,
            Err(e) => {
                self.record_failure(e);
                return;
            }
        };

        self.drain_queued(&app);

        // an instance that never ran does not count as completed
        let ran_cleanly = if self.terminate.is_cancelled() {
            info!("Termination was requested during construction, cycle {cycle} will not run.");
            app.request_stop();
            false
        } else {
            self.set_state(SupervisorState::Running);
            match self.supervise(&app, cycle).await {
                Ok(()) => true,
                Err(e) => {
                    self.record_failure(e);
                    false
                }
            }
        };

        self.set_state(SupervisorState::Stopping);
        let stopped_cleanly = match app.stop().await {
            Ok(_) => true,
            Err(e) => {
                self.record_failure(e);
                false
            }
        };
        drop(app);

        if ran_cleanly && stopped_cleanly {
            self.stats.completed += 1;
            info!("Cycle {cycle} finished.");
        }
    }

    async fn supervise(&mut self, app: &ApplicationHandle<A>, cycle: u64) -> Result<(), CycleError> {
        let mut run = pin!(app.run());

        loop {
            select! {
                res = &mut run => return res,
                _ = self.terminate.cancelled(), if !app.stop_requested() => {
                    info!("Termination requested, stopping cycle {cycle} …");
                    app.request_stop();
                },
                Some(msg) = self.api_rx.recv() => self.process_msg(msg, Some(app)),
            }
        }
    }

    async fn wait_for_next_cycle(&mut self) -> ControlFlow<()> {
        if self.terminate.is_cancelled() {
            return ControlFlow::Break(());
        }

        self.set_state(SupervisorState::CycleWaiting);

        if self.restart_requested {
            info!("Restarting immediately.");
            return ControlFlow::Continue(());
        }

        let delay = self.cycle_config.next_delay();
        match delay {
            Some(delay) => info!("Next cycle in {} ms.", delay.as_millis()),
            None => info!("Single-shot mode, waiting for restart or termination …"),
        }

        let mut wait = pin!(async {
            match delay {
                Some(delay) => sleep(delay).await,
                None => pending().await,
            }
        });

        loop {
            select! {
                _ = &mut wait => return ControlFlow::Continue(()),
                _ = self.terminate.cancelled() => {
                    debug!("Termination requested while waiting for the next cycle.");
                    return ControlFlow::Break(());
                },
                Some(msg) = self.api_rx.recv() => {
                    self.process_msg(msg, None);
                    if self.restart_requested {
                        return ControlFlow::Continue(());
                    }
                },
            }
        }
    }

    /// Answers requests that arrived while the instance was being constructed.
    /// Restarts are dropped, the instance is already a fresh one.
    fn drain_queued(&mut self, app: &ApplicationHandle<A>) {
        while let Ok(msg) = self.api_rx.try_recv() {
            match msg {
                CronBoxMessage::Restart => {
                    debug!("Dropping restart that was requested during construction.")
                }
                msg => self.process_msg(msg, Some(app)),
            }
        }
    }

    fn process_msg(
        &mut self,
        msg: CronBoxMessage<A::Telemetry>,
        app: Option<&ApplicationHandle<A>>,
    ) {
        match msg {
            CronBoxMessage::Restart => {
                if self.restart_requested {
                    return;
                }
                info!("Restart requested.");
                self.restart_requested = true;
                self.stats.restarts += 1;
                if let Some(app) = app {
                    app.request_stop();
                }
            }
            CronBoxMessage::Telemetry(tx) => {
                tx.send(app.and_then(ApplicationHandle::telemetry)).ok();
            }
            CronBoxMessage::Stats(tx) => {
                tx.send(self.stats.clone()).ok();
            }
        }
    }

    fn record_failure(&mut self, e: CycleError) {
        if self.terminate.is_cancelled() {
            warn!("{e}");
        } else {
            error!("{e}");
        }
        self.stats.record_failure(&e);
    }

    fn set_state(&self, state: SupervisorState) {
        let previous = self.state_tx.send_replace(state);
        debug!("{previous} -> {state}");
    }
}

impl<T> CronBoxHandle<T> {
    /// Ends the supervisor loop. Idempotent.
    pub fn terminate(&self) {
        self.terminate.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn state(&self) -> SupervisorState {
        *self.state_rx.borrow()
    }

    /// Waits until the supervisor enters `state`, or until it terminated.
    pub async fn wait_for_state(&self, state: SupervisorState) -> SupervisorState {
        let mut rx = self.state_rx.clone();
        match rx.wait_for(|s| *s == state || s.is_terminal()).await {
            Ok(it) => *it,
            Err(_) => SupervisorState::Terminated,
        }
    }

    /// Stops the live instance and starts the next cycle without delay. In
    /// single-shot mode this is the only way to get another cycle.
    ///
    /// Returns `false` if the supervisor is gone.
    pub async fn restart(&self) -> bool {
        self.api_tx.send(CronBoxMessage::Restart).await.is_ok()
    }

    /// Telemetry of the live instance. `None` if there is no live instance,
    /// it has nothing to report or the supervisor is gone.
    pub async fn telemetry(&self) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        self.api_tx
            .send(CronBoxMessage::Telemetry(tx))
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    pub async fn stats(&self) -> Option<CycleStats> {
        let (tx, rx) = oneshot::channel();
        self.api_tx.send(CronBoxMessage::Stats(tx)).await.ok()?;
        rx.await.ok()
    }
}
