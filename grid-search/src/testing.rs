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
    SearchConfig,
    config::{BIND_ADDRESS, PORT},
};
use grid_common::{Properties, ServiceIdentity};
use std::{
    fmt,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    subscriber::DefaultGuard,
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
};

#[derive(Debug, Clone)]
pub(crate) struct LogLine {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Collects every event emitted on the current thread while installed.
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<LogLine>>>);

impl CapturedLogs {
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn lines(&self) -> Vec<LogLine> {
        match self.0.lock() {
            Ok(it) => it.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn at(&self, level: Level) -> Vec<LogLine> {
        self.lines()
            .into_iter()
            .filter(|it| it.level == level)
            .collect()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.lines().iter().any(|it| it.message.contains(text))
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        let line = LogLine {
            level: *event.metadata().level(),
            target: event.metadata().target().to_owned(),
            message,
        };
        match self.0.lock() {
            Ok(mut it) => it.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

/// Search config listening on an ephemeral loopback port.
#[allow(clippy::unwrap_used)]
pub(crate) fn local_config(tag: &str) -> SearchConfig {
    let mut props = Properties::default();
    props.set(BIND_ADDRESS, "127.0.0.1");
    props.set(PORT, "0");
    SearchConfig::from_properties(
        &props,
        ServiceIdentity::search(),
        std::env::temp_dir().join(format!("grid-search-{tag}-{}", std::process::id())),
    )
    .unwrap()
}

/// Address nobody listens on anymore.
#[allow(clippy::unwrap_used)]
pub(crate) async fn unreachable_backend() -> String {
    let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
    backend.local_addr().unwrap().to_string()
}
