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

//! Connection accept loop (C6). Binds nothing itself — it's handed an
//! already-bound [`TcpListener`] — and spawns one [`ConnectionHandler`]
//! task per accepted connection until told to shut down.
//!
//! Graceful shutdown follows a two-channel idiom: a [`broadcast`] sender
//! tells every in-flight handler (and the accept loop itself) to stop, and
//! an [`mpsc`] sender is cloned into every handler purely so that `run` can
//! wait for the receiver to observe every clone being dropped — i.e. every
//! handler has actually exited — before returning.

mod connection;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};

use crate::corestore::Corestore;

pub use connection::ConnectionHandler;

/// Accept connections on `listener` until `shutdown` fires, handing each
/// one to its own [`ConnectionHandler`] task. `climit` bounds the number of
/// simultaneously open connections: a permit is acquired before every
/// `accept` and returned when that connection's handler is dropped.
///
/// Returns once every handler spawned has exited, so the caller can be
/// sure no request is still in-flight when this future resolves.
pub async fn run(
    listener: TcpListener,
    db: Arc<Corestore>,
    climit: Arc<Semaphore>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let (drain_tx, mut drain_rx) = mpsc::channel::<()>(1);
    loop {
        // Acquire (and immediately forget) a permit before accepting, so a
        // connection storm blocks here instead of piling up handler tasks.
        // `ConnectionHandler::drop` returns the permit when the
        // connection's handler exits.
        let permit = tokio::select! {
            p = climit.clone().acquire_owned() => p.expect("semaphore is never closed"),
            _ = shutdown.recv() => break,
        };
        permit.forget();

        let accepted = tokio::select! {
            a = listener.accept() => a,
            _ = shutdown.recv() => {
                climit.add_permits(1);
                break;
            }
        };
        match accepted {
            Ok((stream, peer)) => {
                log::debug!("accepted connection from {peer}");
                let db = db.clone();
                let handler_shutdown = shutdown.resubscribe();
                let climit = climit.clone();
                let drain_tx = drain_tx.clone();
                tokio::spawn(async move {
                    let mut handler =
                        ConnectionHandler::new(db, stream, handler_shutdown, climit, drain_tx);
                    if let Err(e) = handler.run().await {
                        log::debug!("connection from {peer} ended: {e}");
                    }
                });
            }
            Err(e) => {
                climit.add_permits(1);
                log::warn!("accept error: {e}");
            }
        }
    }
    log::info!("accept loop stopped, draining in-flight connections");
    drop(drain_tx);
    let _ = drain_rx.recv().await;
}
