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

mod application;
pub mod config;
mod configuration;
mod service;
mod telemetry;

#[cfg(test)]
mod testing;

pub use application::SearchApplication;
pub use config::SearchConfig;
pub use configuration::Configuration;
pub use service::{STATUS_PATH, Service, ServiceStatus, ServiceTelemetry};

use cronbox::CronBox;
use miette::Result;
use telemetry::report_telemetry;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle};
use tracing::info;

/// Drives the supervised search application until the subsystem is shut down.
pub async fn run_search(subsys: SubsystemHandle, config: SearchConfig) -> Result<()> {
    info!("Search started!");
    info!(
        "{} {} serving {} on {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.service,
        config.socket_addr()
    );
    info!("you can now query the service status, i.e.:");
    info!(
        "curl \"http://127.0.0.1:{}{}\"",
        config.port, STATUS_PATH
    );

    let terminate = subsys.create_cancellation_token();
    let (cron, handle) = CronBox::<SearchApplication>::new(
        config.service.name.clone(),
        config.cycle,
        config.clone(),
        terminate,
    );

    if let Some(period) = config.telemetry_interval {
        subsys.start(SubsystemBuilder::new("telemetry", move |s| {
            report_telemetry(s, handle, period)
        }));
    }

    let stats = cron.cycle().await;
    info!(
        "{} cycle(s), {} completed, {} failed, {} restart(s)",
        stats.cycles,
        stats.completed,
        stats.failures(),
        stats.restarts
    );
    info!("Search terminated");

    subsys.request_shutdown();

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{CapturedLogs, local_config};
    use std::time::Duration;
    use tokio::time::{sleep, timeout};
    use tokio_graceful_shutdown::Toplevel;

    const PATIENCE: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn shutdown_request_terminates_search_cleanly() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let mut config = local_config("bootstrap");
        config.telemetry_interval = Some(Duration::from_millis(10));

        let res = timeout(
            PATIENCE,
            Toplevel::new(move |s| async move {
                s.start(SubsystemBuilder::new("search", move |s| run_search(s, config)));
                sleep(Duration::from_millis(200)).await;
                s.request_shutdown();
            })
            .handle_shutdown_requests(PATIENCE),
        )
        .await
        .unwrap();

        assert!(res.is_ok(), "{res:?}");
        assert!(logs.contains("Search started!"));
        assert!(logs.contains("search is Running"));
        assert!(logs.contains("1 cycle(s), 1 completed, 0 failed, 0 restart(s)"));
        assert!(logs.contains("Search terminated"));
    }
}
