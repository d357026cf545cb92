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

//! One dispatcher per accepted connection: read a request, dispatch it,
//! write back exactly one reply, and repeat until the peer disconnects, a
//! framing error closes the connection, or the listener signals shutdown.
//!
//! A dispatched request can suspend indefinitely (`BLPOP` with no timeout),
//! so the dispatch step is itself raced against [`watch_for_disconnect`]
//! and the shutdown signal, not just the read step before it. Losing that
//! race drops the in-flight dispatch future outright, which is what lets a
//! cancelled `BLPOP` clean up its queued waiter (see
//! `corestore::list::BlpopWaiter`'s `Drop` impl) instead of leaking it
//! until some unrelated later push.

use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Semaphore};

use crate::corestore::Corestore;
use crate::dispatch::dispatch;
use crate::protocol::{ParseError, Parser, Reply, Request};
use crate::util::DispatchError;

/// Initial read-buffer capacity; just an allocation hint, the buffer grows
/// to fit whatever bulk payloads actually arrive.
const INITIAL_BUF_CAPACITY: usize = 4 * 1024;

pub struct ConnectionHandler {
    db: Arc<Corestore>,
    stream: TcpStream,
    buffer: BytesMut,
    shutdown: broadcast::Receiver<()>,
    climit: Arc<Semaphore>,
    _drain: mpsc::Sender<()>,
}

impl ConnectionHandler {
    pub fn new(
        db: Arc<Corestore>,
        stream: TcpStream,
        shutdown: broadcast::Receiver<()>,
        climit: Arc<Semaphore>,
        drain: mpsc::Sender<()>,
    ) -> Self {
        Self {
            db,
            stream,
            buffer: BytesMut::with_capacity(INITIAL_BUF_CAPACITY),
            shutdown,
            climit,
            _drain: drain,
        }
    }

    /// Run the per-connection request/reply loop to completion.
    pub async fn run(&mut self) -> std::io::Result<()> {
        loop {
            let outcome = tokio::select! {
                r = self.read_request() => r,
                _ = self.shutdown.recv() => return Ok(()),
            };
            let request = match outcome {
                Ok(Some(request)) => request,
                Ok(None) => return Ok(()),
                Err(DispatchError::Framing(msg)) => {
                    self.write_reply(&Reply::error(msg)).await?;
                    return Ok(());
                }
                Err(DispatchError::Io(e)) => return Err(e),
                Err(DispatchError::Protocol(_)) => {
                    unreachable!("read_request never produces a protocol error")
                }
            };
            // Disjoint field borrows: `dispatch` only touches `db`, the
            // watcher only touches `stream`/`buffer`, so all three branches
            // can run concurrently without fighting over `&mut self`.
            let db = &self.db;
            let stream = &mut self.stream;
            let buffer = &mut self.buffer;
            let dispatched = tokio::select! {
                r = dispatch(db, request) => r,
                _ = watch_for_disconnect(stream, buffer) => return Ok(()),
                _ = self.shutdown.recv() => return Ok(()),
            };
            let reply = match dispatched {
                Ok(reply) => reply,
                Err(DispatchError::Protocol(msg)) => Reply::error(msg),
                Err(DispatchError::Framing(msg)) => {
                    self.write_reply(&Reply::error(msg)).await?;
                    return Ok(());
                }
                Err(DispatchError::Io(e)) => return Err(e),
            };
            self.write_reply(&reply).await?;
        }
    }

    /// Read and parse exactly one request, growing the buffer as needed.
    /// `Ok(None)` means the peer closed the connection between requests,
    /// which is not an error.
    async fn read_request(&mut self) -> Result<Option<Request>, DispatchError> {
        loop {
            match Parser::new(&self.buffer).parse() {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }
                Err(ParseError::NotEnough) => {}
                Err(ParseError::BadPacket) => {
                    return Err(DispatchError::Framing(
                        b"ERR Protocol error: invalid request framing".to_vec(),
                    ));
                }
            }
            match self.stream.read_buf(&mut self.buffer).await {
                Ok(0) if self.buffer.is_empty() => return Ok(None),
                Ok(0) => {
                    return Err(DispatchError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed mid-request",
                    )))
                }
                Ok(_) => {}
                Err(e) => return Err(DispatchError::Io(e)),
            }
        }
    }

    async fn write_reply(&mut self, reply: &Reply) -> std::io::Result<()> {
        let bytes = reply.to_bytes();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await
    }
}

/// Resolves once the peer's half of the connection is gone — a clean
/// close (`Ok(0)`) or a read error — and never otherwise. Bytes it reads
/// in the meantime are folded into `buffer` rather than discarded, so a
/// request the peer pipelined ahead of a reply isn't lost; receiving them
/// just means the peer is still there, so the loop keeps watching.
async fn watch_for_disconnect(stream: &mut TcpStream, buffer: &mut BytesMut) {
    loop {
        match stream.read_buf(buffer).await {
            Ok(0) => return,
            Ok(_) => continue,
            Err(_) => return,
        }
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.climit.add_permits(1);
    }
}
