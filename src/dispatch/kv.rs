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

//! `PING`, `ECHO`, `SET`, `GET`, `TYPE` — the verbs that don't belong to a
//! single keyspace, or (`TYPE`'s case) need to look across all three.

use bytes::Bytes;

use crate::corestore::{Corestore, KeyType};
use crate::protocol::Reply;
use crate::util::{arity_error, DispatchError, DispatchResult};

use super::args::parse_px;

pub fn ping(args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("PING", args.len() <= 1);
    Ok(match args.first() {
        Some(msg) => Reply::bulk(msg.clone()),
        None => Reply::Simple("PONG"),
    })
}

pub fn echo(args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("ECHO", args.len() == 1);
    Ok(Reply::bulk(args[0].clone()))
}

pub fn set(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    let ttl_ms = match args.len() {
        2 => None,
        4 => {
            let opt = String::from_utf8_lossy(&args[2]).to_ascii_uppercase();
            if opt != "PX" {
                return Err(DispatchError::protocol("ERR syntax error"));
            }
            Some(parse_px(&args[3])?)
        }
        _ => return Err(arity_error("SET")),
    };
    let key = args[0].clone();
    store.check_type(&key, KeyType::String).map_err(DispatchError::protocol)?;
    let value = args[1].clone();
    // ttl = 0 means "never", per spec: only a *positive* TTL sets an expiry.
    let ttl = ttl_ms.filter(|&ms| ms > 0);
    store.kv.set(key, value, ttl);
    Ok(Reply::ok())
}

pub fn get(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("GET", args.len() == 1);
    store.check_type(&args[0], KeyType::String).map_err(DispatchError::protocol)?;
    Ok(match store.kv.get(&args[0]) {
        Some(v) => Reply::bulk(v),
        None => Reply::nil(),
    })
}

pub fn type_of(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("TYPE", args.len() == 1);
    Ok(Reply::Simple(store.type_of(&args[0]).as_str()))
}
