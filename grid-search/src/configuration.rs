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
use miette::{Context, IntoDiagnostic, Result, miette};
use std::path::{Path, PathBuf};
use tokio::{
    fs,
    io::AsyncWriteExt,
    net::TcpStream,
    sync::Mutex,
    time::timeout,
};
use tracing::{debug, info, instrument, warn};

/// Runtime configuration of one search application instance, including its
/// connection to the grid backend.
pub struct Configuration {
    data_path: PathBuf,
    backend_address: Option<String>,
    backend_timeout: std::time::Duration,
    backend: Mutex<Option<TcpStream>>,
}

impl Configuration {
    #[instrument(skip(config), fields(data_path = %config.data_path.display()))]
    pub async fn open(config: &SearchConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_path)
            .await
            .into_diagnostic()
            .wrap_err_with(|| {
                format!(
                    "could not create data directory {}",
                    config.data_path.display()
                )
            })?;

        Ok(Configuration {
            data_path: config.data_path.clone(),
            backend_address: config.backend_address.clone(),
            backend_timeout: config.backend_timeout,
            backend: Mutex::new(None),
        })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    #[instrument(skip(self))]
    pub async fn connect_backend(&self) -> Result<()> {
        let Some(address) = &self.backend_address else {
            info!("No grid backend configured.");
            return Ok(());
        };

        info!("Connecting to grid backend at {address} …");
        let stream = timeout(self.backend_timeout, TcpStream::connect(address.as_str()))
            .await
            .map_err(|_| {
                miette!(
                    "connecting to grid backend {address} timed out after {} ms",
                    self.backend_timeout.as_millis()
                )
            })?
            .into_diagnostic()
            .wrap_err_with(|| format!("could not connect to grid backend {address}"))?;

        *self.backend.lock().await = Some(stream);
        info!("Connected to grid backend.");

        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.backend.lock().await.is_some()
    }

    /// Closes the backend connection. Closing twice is a no-op.
    #[instrument(skip(self))]
    pub async fn close(&self) -> Result<()> {
        let Some(mut stream) = self.backend.lock().await.take() else {
            debug!("No open backend connection.");
            return Ok(());
        };

        if let Err(e) = stream.shutdown().await {
            warn!("Backend connection was not shut down cleanly: {e}");
        }
        info!("Backend connection closed.");

        Ok(())
    }
}
