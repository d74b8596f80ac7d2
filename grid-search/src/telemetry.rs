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

use crate::service::ServiceTelemetry;
use cronbox::CronBoxHandle;
use miette::Result;
use std::time::Duration;
use tokio::{select, time::interval};
use tokio_graceful_shutdown::SubsystemHandle;
use tracing::{debug, info};

/// Periodically pulls the telemetry of the live search instance and logs it.
pub async fn report_telemetry(
    subsys: SubsystemHandle,
    cron: CronBoxHandle<ServiceTelemetry>,
    period: Duration,
) -> Result<()> {
    let mut interval = interval(period);
    // the first tick completes immediately
    interval.tick().await;

    while !cron.is_terminated() {
        select! {
            _ = interval.tick() => log_telemetry(&cron).await,
            _ = subsys.on_shutdown_requested() => break,
        }
    }

    debug!("Telemetry reporter stopped.");

    Ok(())
}

async fn log_telemetry(cron: &CronBoxHandle<ServiceTelemetry>) {
    match cron.telemetry().await {
        Some(telemetry) => info!(
            "{} is {:?}, up for {} ms, {} request(s) served.",
            telemetry.service, telemetry.status, telemetry.uptime_millis, telemetry.requests
        ),
        None => info!("No telemetry available ({}).", cron.state()),
    }
}
