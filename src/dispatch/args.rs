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

//! Shared argument parsing for the command dispatcher. Every verb arm
//! validates its own arity before calling into here; these helpers only
//! worry about turning one already-arity-checked byte string into a typed
//! value, or producing the right `ERR ...` message when it doesn't parse.

use std::time::Duration;

use crate::corestore::stream::StreamId;
use crate::util::{DispatchError, DispatchResult};

/// A signed 64-bit integer argument (e.g. `LRANGE`'s `start`/`end`).
pub fn parse_i64(arg: &[u8]) -> DispatchResult<i64> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(not_an_integer)
}

/// A non-negative count argument (e.g. `LPOP`'s optional `count`).
pub fn parse_count(arg: &[u8]) -> DispatchResult<usize> {
    let n = parse_i64(arg)?;
    usize::try_from(n).map_err(|_| not_an_integer())
}

/// `SET ... PX <ms>`'s millisecond TTL.
pub fn parse_px(arg: &[u8]) -> DispatchResult<u64> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(not_an_integer)
}

/// `BLPOP`'s timeout: a non-negative, possibly fractional number of
/// seconds with at least millisecond precision. Zero means "wait
/// indefinitely", reported to the caller as `None`.
pub fn parse_timeout(arg: &[u8]) -> DispatchResult<Option<Duration>> {
    let secs: f64 = std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| DispatchError::protocol("ERR timeout is not a float or out of range"))?;
    if secs == 0.0 {
        Ok(None)
    } else {
        Ok(Some(Duration::from_secs_f64(secs)))
    }
}

/// A stream ID of the form `ms-seq`, defaulting the sequence to
/// `default_seq` when the `-seq` half is omitted (used to complete
/// `XRANGE`'s bounds and `XREAD`'s per-stream cursors per spec).
pub fn parse_stream_id(arg: &[u8], default_seq: u64) -> DispatchResult<StreamId> {
    let s = std::str::from_utf8(arg).map_err(|_| bad_stream_id())?;
    let (ms_part, seq_part) = match s.split_once('-') {
        Some((ms, seq)) => (ms, Some(seq)),
        None => (s, None),
    };
    let ms: u64 = ms_part.parse().map_err(|_| bad_stream_id())?;
    let seq = match seq_part {
        Some(seq) => seq.parse().map_err(|_| bad_stream_id())?,
        None => default_seq,
    };
    Ok(StreamId { ms, seq })
}

fn not_an_integer() -> DispatchError {
    DispatchError::protocol("ERR value is not an integer or out of range")
}

pub fn bad_stream_id() -> DispatchError {
    DispatchError::protocol("ERR Invalid stream ID specified as stream command argument")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_rejects_negative() {
        assert!(parse_count(b"-1").is_err());
        assert_eq!(parse_count(b"3").unwrap(), 3);
    }

    #[test]
    fn timeout_zero_means_wait_forever() {
        assert_eq!(parse_timeout(b"0").unwrap(), None);
        assert_eq!(parse_timeout(b"0.0").unwrap(), None);
    }

    #[test]
    fn timeout_supports_fractional_seconds() {
        let d = parse_timeout(b"0.2").unwrap().unwrap();
        assert_eq!(d, Duration::from_millis(200));
    }

    #[test]
    fn stream_id_defaults_missing_sequence() {
        assert_eq!(parse_stream_id(b"5", 0).unwrap(), StreamId { ms: 5, seq: 0 });
        assert_eq!(
            parse_stream_id(b"5", u64::MAX).unwrap(),
            StreamId { ms: 5, seq: u64::MAX }
        );
        assert_eq!(parse_stream_id(b"5-2", 0).unwrap(), StreamId { ms: 5, seq: 2 });
    }
}
