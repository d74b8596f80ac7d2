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

use clap::Parser;
use grid_common::{Properties, ServiceIdentity, logging};
use grid_search::{SearchConfig, run_search};
use miette::Result;
use std::{path::PathBuf, time::Duration};
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(author, version, about = "YaCy Grid search node", long_about = None)]
struct Args {
    /// Directory for application data
    #[arg(short, long, default_value = "data")]
    data_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_panic_hook();
    dotenvy::dotenv().ok();
    logging::init()?;
    let args: Args = Args::parse();

    let properties = Properties::from_env();
    for (key, value) in properties.iter() {
        debug!("{key} = {value}");
    }
    let config =
        SearchConfig::from_properties(&properties, ServiceIdentity::search(), args.data_path)?;

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("search", move |s| run_search(s, config)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await?;

    Ok(())
}
