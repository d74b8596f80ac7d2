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

use crate::config::SearchConfig;
use axum::{Json, Router, extract::State, routing::get};
use grid_common::ServiceIdentity;
use miette::{Context, IntoDiagnostic, Result, miette};
use serde::Serialize;
use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Instant,
};
use tokio::{net::TcpListener, select};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, instrument};

pub const STATUS_PATH: &str = "/yacy/grid/mcp/status.json";

/// Point-in-time view of a running service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTelemetry {
    pub service: String,
    pub status: ServiceStatus,
    pub uptime_millis: u64,
    pub requests: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceStatus {
    Running,
    Stopping,
}

struct ServiceState {
    identity: ServiceIdentity,
    started: Instant,
    requests: AtomicU64,
    stopping: AtomicBool,
}

impl ServiceState {
    fn telemetry(&self) -> ServiceTelemetry {
        ServiceTelemetry {
            service: self.identity.name.clone(),
            status: if self.stopping.load(Ordering::Acquire) {
                ServiceStatus::Stopping
            } else {
                ServiceStatus::Running
            },
            uptime_millis: self.started.elapsed().as_millis() as u64,
            requests: self.requests.load(Ordering::Relaxed),
        }
    }
}

/// REST front end of a search application. The listener is bound on
/// construction, serving starts with [`Service::serve`].
pub struct Service {
    state: Arc<ServiceState>,
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    shutdown: CancellationToken,
}

impl Service {
    #[instrument(skip(config), fields(addr = %config.socket_addr()))]
    pub async fn bind(config: &SearchConfig) -> Result<Self> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("could not bind REST listener to {addr}"))?;
        let local_addr = listener.local_addr().into_diagnostic()?;
        info!("REST listener bound to {local_addr}.");

        Ok(Service {
            state: Arc::new(ServiceState {
                identity: config.service.clone(),
                started: Instant::now(),
                requests: AtomicU64::new(0),
                stopping: AtomicBool::new(false),
            }),
            local_addr,
            listener: Mutex::new(Some(listener)),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves requests until `stop` is cancelled or [`Service::stop`] is called.
    /// A service can only be served once.
    pub async fn serve(&self, stop: CancellationToken) -> Result<()> {
        let listener = self
            .take_listener()
            .ok_or_else(|| miette!("REST service has already been started or closed"))?;

        let app = Router::new()
            .route(STATUS_PATH, get(status))
            .with_state(self.state.clone());

        let shutdown = self.shutdown.clone();
        info!("Serving REST requests on {} …", self.local_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                select! {
                    _ = stop.cancelled() => (),
                    _ = shutdown.cancelled() => (),
                }
            })
            .await
            .into_diagnostic()
            .wrap_err("REST server failed")?;
        info!("REST server stopped.");

        Ok(())
    }

    pub fn stop(&self) {
        if !self.state.stopping.swap(true, Ordering::AcqRel) {
            info!("Stopping REST server …");
        }
        self.shutdown.cancel();
    }

    /// Releases the listener if it was never served.
    pub fn close(&self) {
        if self.take_listener().is_some() {
            info!("Closed unused REST listener on {}.", self.local_addr);
        }
    }

    pub fn telemetry(&self) -> ServiceTelemetry {
        self.state.telemetry()
    }

    fn take_listener(&self) -> Option<TcpListener> {
        match self.listener.lock() {
            Ok(mut it) => it.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[instrument(level = Level::TRACE, skip(state))]
async fn status(State(state): State<Arc<ServiceState>>) -> Json<ServiceTelemetry> {
    state.requests.fetch_add(1, Ordering::Relaxed);
    Json(state.telemetry())
}
