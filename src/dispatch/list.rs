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

//! `RPUSH`, `LPUSH`, `LPOP`, `LLEN`, `LRANGE`, and the blocking `BLPOP`
//! rendezvous. `BLPOP` is the one verb in this dispatcher that can suspend.

use bytes::Bytes;

use crate::corestore::{Corestore, KeyType};
use crate::protocol::Reply;
use crate::util::{DispatchError, DispatchResult};

use super::args::{parse_count, parse_i64, parse_timeout};

pub fn push(store: &Corestore, args: &[Bytes], to_front: bool) -> DispatchResult<Reply> {
    let verb = if to_front { "LPUSH" } else { "RPUSH" };
    crate::ensure_arity!(verb, args.len() >= 2);
    let key = args[0].clone();
    store.check_type(&key, KeyType::List).map_err(DispatchError::protocol)?;
    let values = args[1..].to_vec();
    let len = if to_front {
        store.lists.lpush(key, values)
    } else {
        store.lists.rpush(key, values)
    };
    Ok(Reply::Integer(len))
}

/// A `count` of exactly one (the default when no `count` argument is
/// given) replies with a bulk string, or null bulk if the list was empty;
/// any other `count` replies with an array, possibly empty.
pub fn lpop(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("LPOP", !args.is_empty() && args.len() <= 2);
    store.check_type(&args[0], KeyType::List).map_err(DispatchError::protocol)?;
    let count = match args.get(1) {
        Some(arg) => parse_count(arg)?,
        None => 1,
    };
    let mut popped = store.lists.lpop(&args[0], count);
    Ok(if count == 1 {
        match popped.pop() {
            Some(v) => Reply::bulk(v),
            None => Reply::nil(),
        }
    } else {
        Reply::array(popped.into_iter().map(Reply::bulk).collect())
    })
}

pub fn llen(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("LLEN", args.len() == 1);
    store.check_type(&args[0], KeyType::List).map_err(DispatchError::protocol)?;
    Ok(Reply::Integer(store.lists.llen(&args[0])))
}

pub fn lrange(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("LRANGE", args.len() == 3);
    store.check_type(&args[0], KeyType::List).map_err(DispatchError::protocol)?;
    let start = parse_i64(&args[1])?;
    let end = parse_i64(&args[2])?;
    let elements = store.lists.lrange(&args[0], start, end);
    Ok(Reply::array(elements.into_iter().map(Reply::bulk).collect()))
}

pub async fn blpop(store: &Corestore, args: &[Bytes]) -> DispatchResult<Reply> {
    crate::ensure_arity!("BLPOP", args.len() == 2);
    let key = args[0].clone();
    store.check_type(&key, KeyType::List).map_err(DispatchError::protocol)?;
    let timeout = parse_timeout(&args[1])?;
    Ok(match store.lists.blpop(key.clone(), timeout).await {
        Some(elem) => Reply::array(vec![Reply::bulk(key), Reply::bulk(elem)]),
        None => Reply::empty_array(),
    })
}
