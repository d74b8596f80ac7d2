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
    config::SearchConfig,
    configuration::Configuration,
    service::{Service, ServiceTelemetry},
};
use cronbox::Application;
use miette::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The search node as seen by the supervisor: a REST service plus its
/// configuration and backend connection.
pub struct SearchApplication {
    configuration: Configuration,
    service: Service,
}

impl Application for SearchApplication {
    type Context = SearchConfig;
    type Telemetry = ServiceTelemetry;

    async fn construct(config: SearchConfig) -> Result<Self> {
        info!("Starting Search application …");

        let configuration = Configuration::open(&config).await?;
        let service = Service::bind(&config).await?;
        if let Err(e) = configuration.connect_backend().await {
            service.close();
            return Err(e);
        }

        Ok(SearchApplication {
            configuration,
            service,
        })
    }

    async fn run(&self, stop: CancellationToken) -> Result<()> {
        self.service.serve(stop).await
    }

    async fn stop(&self) -> Result<()> {
        info!("Stopping Search application …");

        self.service.stop();
        self.service.close();
        self.configuration.close().await
    }

    fn telemetry(&self) -> Option<ServiceTelemetry> {
        Some(self.service.telemetry())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{BIND_ADDRESS, PORT};
    use cronbox::{CronBox, CycleConfig, SupervisorState};
    use grid_common::{Properties, ServiceIdentity};
    use std::time::Duration;
    use crate::testing::{CapturedLogs, unreachable_backend};
    use tokio::{net::TcpListener, time::timeout};
    use tracing::Level;

    fn config() -> SearchConfig {
        let mut props = Properties::default();
        props.set(BIND_ADDRESS, "127.0.0.1");
        props.set(PORT, "0");
        SearchConfig::from_properties(
            &props,
            ServiceIdentity::search(),
            std::env::temp_dir().join(format!("grid-search-app-{}", std::process::id())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let app = SearchApplication::construct(config()).await.unwrap();
        app.stop().await.unwrap();
        app.stop().await.unwrap();
        assert!(app.run(CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_backend_fails_construction() {
        let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config();
        config.backend_address = Some(backend.local_addr().unwrap().to_string());
        config.backend_timeout = Duration::from_secs(2);
        drop(backend);

        assert!(SearchApplication::construct(config).await.is_err());
    }

    #[tokio::test]
    async fn construction_failure_is_logged_once_by_the_supervisor() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let mut config = config();
        config.backend_address = Some(unreachable_backend().await);
        config.backend_timeout = Duration::from_secs(2);

        let (cron, handle) = CronBox::<SearchApplication>::new(
            "search",
            CycleConfig::single_shot(),
            config,
            CancellationToken::new(),
        );
        let (stats, ()) = tokio::join!(cron.cycle(), async {
            handle.wait_for_state(SupervisorState::CycleWaiting).await;
            handle.terminate();
        });

        assert_eq!(stats.construction_failures, 1);
        let errors = logs.at(Level::ERROR);
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert_eq!(errors[0].target, "cronbox::supervisor");
        assert!(logs.at(Level::WARN).is_empty(), "{:?}", logs.at(Level::WARN));
    }

    #[tokio::test]
    async fn supervised_search_reports_telemetry_and_terminates() {
        let terminate = CancellationToken::new();
        let (cron, handle) = CronBox::<SearchApplication>::new(
            "search",
            CycleConfig::single_shot(),
            config(),
            terminate.clone(),
        );
        let task = tokio::spawn(cron.cycle());

        assert_eq!(
            handle.wait_for_state(SupervisorState::Running).await,
            SupervisorState::Running
        );
        let telemetry = handle.telemetry().await.unwrap();
        assert_eq!(telemetry.service, "search");

        terminate.cancel();
        let stats = timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failures(), 0);
    }
}
