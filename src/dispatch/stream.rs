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

//! `XADD`, `XRANGE`, `XREAD` — the append-only stream keyspace.

use bytes::Bytes;

use crate::corestore::stream::{IdSpec, StreamEntry, StreamId};
use crate::corestore::{Corestore, KeyType};
use crate::util::{arity_error, DispatchError, DispatchResult};

use super::args::{bad_stream_id, parse_stream_id};
use crate::protocol::Reply;

pub fn xadd(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    if args.len() < 4 || args.len() % 2 != 0 {
        return Err(arity_error("XADD"));
    }
    let key = args[0].clone();
    store.check_type(&key, KeyType::Stream).map_err(DispatchError::protocol)?;
    let spec = parse_id_spec(&args[1])?;
    let fields = args[2..]
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    store
        .streams
        .xadd(key, spec, fields)
        .map(|id| Reply::bulk(id.to_string()))
        .map_err(|e| DispatchError::protocol(format!("ERR {e}")))
}

pub fn xrange(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("XRANGE", args.len() == 3);
    store.check_type(&args[0], KeyType::Stream).map_err(DispatchError::protocol)?;
    let start = parse_range_bound(&args[1], b'-', 0)?;
    let end = parse_range_bound(&args[2], b'+', u64::MAX)?;
    let entries = store.streams.xrange(&args[0], start, end);
    Ok(Reply::array(entries.into_iter().map(entry_reply).collect()))
}

pub fn xread(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    if args.len() < 3 {
        return Err(arity_error("XREAD"));
    }
    let keyword = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
    if keyword != "STREAMS" {
        return Err(DispatchError::protocol("ERR syntax error"));
    }
    let rest = &args[1..];
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(DispatchError::protocol(
            "ERR Unbalanced XREAD list of streams: for each stream key an ID or '$' must be specified.",
        ));
    }
    let n = rest.len() / 2;
    let keys = &rest[..n];
    let ids = &rest[n..];
    let mut out = Vec::with_capacity(n);
    for (key, id_arg) in keys.iter().zip(ids.iter()) {
        store.check_type(key, KeyType::Stream).map_err(DispatchError::protocol)?;
        let after = parse_stream_id(id_arg, 0)?;
        let entries = store.streams.xread_one(key, after);
        out.push(Reply::array(vec![
            Reply::bulk(key.clone()),
            Reply::array(entries.into_iter().map(entry_reply).collect()),
        ]));
    }
    Ok(Reply::array(out))
}

fn entry_reply(entry: StreamEntry) -> Reply {
    let fields = entry
        .fields
        .into_iter()
        .flat_map(|(f, v)| [Reply::bulk(f), Reply::bulk(v)])
        .collect();
    Reply::array(vec![Reply::bulk(entry.id.to_string()), Reply::array(fields)])
}

/// `XADD`'s `id_spec`: `"*"` (fully automatic), `"<ms>-*"` (explicit
/// millisecond, automatic sequence), or a fully explicit `"<ms>-<seq>"`.
fn parse_id_spec(arg: &[u8]) -> DispatchResult<IdSpec> {
    if arg == b"*" {
        return Ok(IdSpec::Auto);
    }
    let s = std::str::from_utf8(arg).map_err(|_| bad_stream_id())?;
    match s.split_once('-') {
        Some((ms, "*")) => Ok(IdSpec::AutoSeq {
            ms: ms.parse().map_err(|_| bad_stream_id())?,
        }),
        Some((ms, seq)) => Ok(IdSpec::Explicit(StreamId {
            ms: ms.parse().map_err(|_| bad_stream_id())?,
            seq: seq.parse().map_err(|_| bad_stream_id())?,
        })),
        None => Ok(IdSpec::Explicit(StreamId {
            ms: s.parse().map_err(|_| bad_stream_id())?,
            seq: 0,
        })),
    }
}

/// An `XRANGE` bound: the single-byte wildcard (`-` for start, `+` for
/// end) maps to the absolute minimum/maximum ID; otherwise a bare `ms` is
/// completed with `default_seq` exactly as `parse_stream_id` does.
fn parse_range_bound(arg: &[u8], wildcard: u8, default_seq: u64) -> DispatchResult<StreamId> {
    if arg.len() == 1 && arg[0] == wildcard {
        return Ok(if wildcard == b'-' {
            StreamId::MIN
        } else {
            StreamId::MAX
        });
    }
    parse_stream_id(arg, default_seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corestore::Corestore;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn xadd_resolves_explicit_id() {
        let store = Corestore::new();
        let reply = xadd(&store, &[b("s"), b("1-1"), b("t"), b("95")]).unwrap();
        assert_eq!(reply, Reply::bulk(b("1-1")));
    }

    #[test]
    fn xadd_rejects_non_monotonic_id() {
        let store = Corestore::new();
        xadd(&store, &[b("s"), b("1-1"), b("t"), b("95")]).unwrap();
        let err = xadd(&store, &[b("s"), b("1-1"), b("t"), b("96")]).unwrap_err();
        match err {
            DispatchError::Protocol(msg) => {
                assert!(String::from_utf8_lossy(&msg).starts_with(
                    "ERR The ID specified in XADD is equal or smaller"
                ));
            }
            _ => panic!("expected a protocol error"),
        }
    }

    #[test]
    fn xadd_auto_seq_increments_on_same_millisecond() {
        let store = Corestore::new();
        let id1 = xadd(&store, &[b("s"), b("5-*"), b("t"), b("1")]).unwrap();
        assert_eq!(id1, Reply::bulk(b("5-0")));
        let id2 = xadd(&store, &[b("s"), b("5-*"), b("t"), b("2")]).unwrap();
        assert_eq!(id2, Reply::bulk(b("5-1")));
    }

    #[test]
    fn xrange_wildcards_cover_the_whole_stream() {
        let store = Corestore::new();
        for ms in 1..=3u64 {
            xadd(&store, &[b("s"), Bytes::from(format!("{ms}-0")), b("t"), b("1")]).unwrap();
        }
        let reply = xrange(&store, &[b("s"), b("-"), b("+")]).unwrap();
        match reply {
            Reply::Array(Some(items)) => assert_eq!(items.len(), 3),
            _ => panic!("expected an array"),
        }
    }

    #[test]
    fn xread_returns_per_stream_pairs_in_input_order() {
        let store = Corestore::new();
        xadd(&store, &[b("a"), b("1-0"), b("f"), b("v")]).unwrap();
        xadd(&store, &[b("b"), b("1-0"), b("f"), b("v")]).unwrap();
        let reply = xread(&store, &[b("STREAMS"), b("a"), b("b"), b("0-0"), b("0-0")]).unwrap();
        match reply {
            Reply::Array(Some(items)) => assert_eq!(items.len(), 2),
            _ => panic!("expected an array"),
        }
    }

    #[test]
    fn xadd_rejects_a_key_already_holding_a_string() {
        let store = Corestore::new();
        store.kv.set(b("k"), b("v"), None);
        let err = xadd(&store, &[b("k"), b("1-1"), b("t"), b("1")]).unwrap_err();
        match err {
            DispatchError::Protocol(msg) => assert!(msg.starts_with(b"WRONGTYPE")),
            _ => panic!("expected a protocol error"),
        }
    }

    #[test]
    fn xrange_rejects_a_key_already_holding_a_list() {
        let store = Corestore::new();
        store.lists.rpush(b("k"), vec![b("a")]);
        let err = xrange(&store, &[b("k"), b("-"), b("+")]).unwrap_err();
        match err {
            DispatchError::Protocol(msg) => assert!(msg.starts_with(b"WRONGTYPE")),
            _ => panic!("expected a protocol error"),
        }
    }

    #[test]
    fn xread_rejects_a_key_already_holding_a_string() {
        let store = Corestore::new();
        xadd(&store, &[b("a"), b("1-0"), b("f"), b("v")]).unwrap();
        store.kv.set(b("b"), b("v"), None);
        let err = xread(&store, &[b("STREAMS"), b("a"), b("b"), b("0-0"), b("0-0")]).unwrap_err();
        match err {
            DispatchError::Protocol(msg) => assert!(msg.starts_with(b"WRONGTYPE")),
            _ => panic!("expected a protocol error"),
        }
    }
}
