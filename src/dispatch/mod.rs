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

//! The command dispatcher (C5): one already-parsed request in, exactly one
//! [`Reply`] out. Arity is checked before any keyspace is ever touched;
//! unknown verbs and bad arguments are reported as ordinary protocol
//! errors that leave the connection open (see [`crate::util::DispatchError`]).

mod args;
mod kv;
mod list;
mod stream;

use bytes::Bytes;

use crate::corestore::Corestore;
use crate::protocol::{Reply, Request};
use crate::util::{DispatchError, DispatchResult};

/// Dispatch one request against `store`. The only verb that can suspend is
/// `BLPOP`, so this whole function is async even though every other arm
/// resolves immediately.
pub async fn dispatch(store: &Corestore, mut request: Request) -> DispatchResult<Reply> {
    if request.is_empty() {
        // `*0\r\n` parses cleanly but carries no verb; the dispatcher still
        // owes the caller exactly one reply.
        return Err(DispatchError::protocol("ERR unknown command ''"));
    }
    let verb_raw = request.remove(0);
    let verb = String::from_utf8_lossy(&verb_raw).to_ascii_uppercase();
    let args = request;
    match verb.as_str() {
        "PING" => kv::ping(&args),
        "ECHO" => kv::echo(&args),
        "SET" => kv::set(store, &args),
        "GET" => kv::get(store, &args),
        "TYPE" => kv::type_of(store, &args),
        "RPUSH" => list::push(store, &args, false),
        "LPUSH" => list::push(store, &args, true),
        "LPOP" => list::lpop(store, &args),
        "LLEN" => list::llen(store, &args),
        "LRANGE" => list::lrange(store, &args),
        "BLPOP" => list::blpop(store, &args).await,
        "XADD" => stream::xadd(store, &args),
        "XRANGE" => stream::xrange(store, &args),
        "XREAD" => stream::xread(store, &args),
        _ => Err(unknown_command(&verb_raw)),
    }
}

fn unknown_command(raw: &Bytes) -> DispatchError {
    DispatchError::protocol(format!(
        "ERR unknown command '{}'",
        String::from_utf8_lossy(raw)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corestore::Corestore;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn req(parts: &[&str]) -> Request {
        parts.iter().map(|p| b(p)).collect()
    }

    #[tokio::test]
    async fn unknown_verb_is_an_error_that_keeps_the_connection_open() {
        let store = Corestore::new();
        let err = dispatch(&store, req(&["FROBNICATE", "x"])).await.unwrap_err();
        match err {
            DispatchError::Protocol(msg) => {
                assert_eq!(
                    &msg[..],
                    b"ERR unknown command 'FROBNICATE'".as_slice()
                );
            }
            _ => panic!("unknown verbs must be protocol errors, not framing errors"),
        }
    }

    #[tokio::test]
    async fn verb_matching_is_case_insensitive() {
        let store = Corestore::new();
        let reply = dispatch(&store, req(&["ping"])).await.unwrap();
        assert_eq!(reply, Reply::Simple("PONG"));
    }

    #[tokio::test]
    async fn set_then_get_roundtrips_through_the_dispatcher() {
        let store = Corestore::new();
        assert_eq!(dispatch(&store, req(&["SET", "k", "v"])).await.unwrap(), Reply::ok());
        assert_eq!(
            dispatch(&store, req(&["GET", "k"])).await.unwrap(),
            Reply::bulk(b("v"))
        );
    }

    #[tokio::test]
    async fn type_consults_every_keyspace() {
        let store = Corestore::new();
        dispatch(&store, req(&["RPUSH", "l", "a"])).await.unwrap();
        assert_eq!(
            dispatch(&store, req(&["TYPE", "l"])).await.unwrap(),
            Reply::Simple("list")
        );
    }

    #[tokio::test]
    async fn empty_request_is_reported_without_dropping_the_reply() {
        let store = Corestore::new();
        let err = dispatch(&store, Vec::new()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Protocol(_)));
    }
}
