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

//! The stream keyspace: append-only, ID-ordered event logs.
//!
//! An ID is a `(ms, seq)` pair rendered `"ms-seq"` and totally ordered
//! lexicographically on the pair. Reads (`XRANGE`/`XREAD`) dominate
//! appends, so each stream's entries sit behind a `RwLock` and are located
//! with binary search rather than a linear scan.

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId { ms: u64::MAX, seq: u64::MAX };

    /// The smallest possible ID for a given millisecond: `ms-0`.
    pub fn floor(ms: u64) -> Self {
        StreamId { ms, seq: 0 }
    }

    /// The largest possible ID for a given millisecond: `ms-MAX`.
    pub fn ceil(ms: u64) -> Self {
        StreamId { ms, seq: u64::MAX }
    }

    pub fn is_zero(&self) -> bool {
        self.ms == 0 && self.seq == 0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// How the caller wants the next ID resolved; mirrors the three `XADD` id
/// spellings: a fully explicit `ms-seq`, an explicit `ms` with an
/// auto-assigned sequence (`ms-*`), or a fully auto-generated ID (`*`).
#[derive(Debug, Clone, Copy)]
pub enum IdSpec {
    Explicit(StreamId),
    AutoSeq { ms: u64 },
    Auto,
}

#[derive(Debug)]
pub enum XaddError {
    /// The resolved ID is not strictly greater than `0-0`.
    NotPositive,
    /// The resolved ID does not strictly exceed the stream's last ID.
    NotMonotonic,
}

impl fmt::Display for XaddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive => {
                write!(f, "The ID specified in XADD must be greater than 0-0")
            }
            Self::NotMonotonic => write!(
                f,
                "The ID specified in XADD is equal or smaller than the target stream top item"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(Bytes, Bytes)>,
}

#[derive(Default)]
struct StreamData {
    entries: Vec<StreamEntry>,
}

#[derive(Default)]
pub struct StreamStore {
    map: RwLock<HashMap<Bytes, StreamData>>,
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl StreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `spec` against `key`'s current last ID and, if accepted,
    /// append the entry. Returns the resolved ID.
    pub fn xadd(
        &self,
        key: Bytes,
        spec: IdSpec,
        fields: Vec<(Bytes, Bytes)>,
    ) -> Result<StreamId, XaddError> {
        let mut map = self.map.write();
        let entry = map.entry(key).or_default();
        let last = entry.entries.last().map(|e| e.id);
        let id = resolve_id(spec, last)?;
        entry.entries.push(StreamEntry { id, fields });
        Ok(id)
    }

    /// Every entry with `start <= id <= end`, located by binary search over
    /// the strictly increasing ID order.
    pub fn xrange(&self, key: &[u8], start: StreamId, end: StreamId) -> Vec<StreamEntry> {
        let map = self.map.read();
        let Some(data) = map.get(key) else {
            return Vec::new();
        };
        if start > end {
            return Vec::new();
        }
        let lo = data.entries.partition_point(|e| e.id < start);
        let hi = data.entries.partition_point(|e| e.id <= end);
        data.entries[lo..hi].to_vec()
    }

    /// Every entry in `key` with ID strictly greater than `after`.
    pub fn xread_one(&self, key: &[u8], after: StreamId) -> Vec<StreamEntry> {
        let map = self.map.read();
        let Some(data) = map.get(key) else {
            return Vec::new();
        };
        let lo = data.entries.partition_point(|e| e.id <= after);
        data.entries[lo..].to_vec()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.map.read().contains_key(key)
    }
}

fn resolve_id(spec: IdSpec, last: Option<StreamId>) -> Result<StreamId, XaddError> {
    let id = match spec {
        IdSpec::Explicit(id) => {
            if id.is_zero() {
                return Err(XaddError::NotPositive);
            }
            if let Some(last) = last {
                if id <= last {
                    return Err(XaddError::NotMonotonic);
                }
            }
            id
        }
        IdSpec::AutoSeq { ms } => match last {
            None => {
                if ms == 0 {
                    StreamId { ms, seq: 1 }
                } else {
                    StreamId { ms, seq: 0 }
                }
            }
            Some(last) => {
                if ms < last.ms {
                    return Err(XaddError::NotMonotonic);
                } else if ms == last.ms {
                    StreamId { ms, seq: last.seq + 1 }
                } else if ms == 0 {
                    StreamId { ms, seq: 1 }
                } else {
                    StreamId { ms, seq: 0 }
                }
            }
        },
        IdSpec::Auto => {
            let now = wall_clock_ms();
            match last {
                None => StreamId { ms: now, seq: 0 },
                Some(last) => {
                    if now > last.ms {
                        StreamId { ms: now, seq: 0 }
                    } else {
                        // now == last.ms, or a clock regression (now < last.ms):
                        // bump the sequence on the previously recorded millisecond.
                        StreamId { ms: last.ms, seq: last.seq + 1 }
                    }
                }
            }
        }
    };
    if id.is_zero() {
        return Err(XaddError::NotPositive);
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn fields() -> Vec<(Bytes, Bytes)> {
        vec![(b("t"), b("1"))]
    }

    #[test]
    fn explicit_ids_must_be_strictly_increasing() {
        let store = StreamStore::new();
        let id1 = store
            .xadd(b("s"), IdSpec::Explicit(StreamId { ms: 1, seq: 1 }), fields())
            .unwrap();
        assert_eq!(id1, StreamId { ms: 1, seq: 1 });
        let err = store
            .xadd(b("s"), IdSpec::Explicit(StreamId { ms: 1, seq: 1 }), fields())
            .unwrap_err();
        assert!(matches!(err, XaddError::NotMonotonic));
    }

    #[test]
    fn zero_zero_is_always_rejected() {
        let store = StreamStore::new();
        let err = store
            .xadd(b("s"), IdSpec::Explicit(StreamId::MIN), fields())
            .unwrap_err();
        assert!(matches!(err, XaddError::NotPositive));
    }

    #[test]
    fn auto_seq_on_empty_stream() {
        let store = StreamStore::new();
        let id = store.xadd(b("s"), IdSpec::AutoSeq { ms: 5 }, fields()).unwrap();
        assert_eq!(id, StreamId { ms: 5, seq: 0 });
        let id2 = store.xadd(b("s"), IdSpec::AutoSeq { ms: 5 }, fields()).unwrap();
        assert_eq!(id2, StreamId { ms: 5, seq: 1 });
    }

    #[test]
    fn auto_seq_rejects_ms_regression() {
        let store = StreamStore::new();
        store.xadd(b("s"), IdSpec::AutoSeq { ms: 5 }, fields()).unwrap();
        let err = store
            .xadd(b("s"), IdSpec::AutoSeq { ms: 4 }, fields())
            .unwrap_err();
        assert!(matches!(err, XaddError::NotMonotonic));
    }

    #[test]
    fn xrange_is_inclusive_and_ordered() {
        let store = StreamStore::new();
        for ms in 1..=5u64 {
            store
                .xadd(b("s"), IdSpec::Explicit(StreamId { ms, seq: 0 }), fields())
                .unwrap();
        }
        let got = store.xrange(
            b"s",
            StreamId { ms: 2, seq: 0 },
            StreamId { ms: 4, seq: 0 },
        );
        let ids: Vec<_> = got.into_iter().map(|e| e.id.ms).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn xrange_on_missing_stream_is_empty() {
        let store = StreamStore::new();
        assert!(store.xrange(b"nope", StreamId::MIN, StreamId::MAX).is_empty());
    }

    #[test]
    fn xread_returns_entries_strictly_after_cursor() {
        let store = StreamStore::new();
        for ms in 1..=3u64 {
            store
                .xadd(b("s"), IdSpec::Explicit(StreamId { ms, seq: 0 }), fields())
                .unwrap();
        }
        let got = store.xread_one(b"s", StreamId { ms: 1, seq: 0 });
        let ids: Vec<_> = got.into_iter().map(|e| e.id.ms).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
