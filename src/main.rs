/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

//! Process entry point (C7): parse CLI flags, install the logger, bind the
//! listener, and run the accept loop until Ctrl-C.

use std::sync::Arc;

use tokio::sync::{broadcast, Semaphore};

use tridentdb::config::Args;
use tridentdb::corestore::Corestore;
use tridentdb::dbnet;

#[cfg(all(not(target_env = "msvc"), not(miri)))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse_from_env();
    init_logger(args.verbose);

    let db = Arc::new(Corestore::new());
    let climit = Arc::new(Semaphore::new(args.max_connections));
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    log::info!("tridentd listening on {}", args.bind);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let accept_loop = tokio::spawn(dbnet::run(listener, db, climit, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    log::info!("received Ctrl-C, shutting down");
    // No receivers besides the accept loop's are subscribed yet, so a send
    // failure here would only mean the accept loop already exited on its own.
    let _ = shutdown_tx.send(());
    let _ = accept_loop.await;
    Ok(())
}
