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

//! The byte-value keyspace: `SET`/`GET` with optional millisecond TTL.
//!
//! Reads dominate writes here so the map sits behind a `RwLock`. Expiry is
//! passive: a key outliving its TTL is not proactively reaped, only treated
//! as absent the next time it's looked up.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::RwLock;

struct Entry {
    data: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(t) => now < t,
            None => true,
        }
    }
}

#[derive(Default)]
pub struct KvStore {
    map: RwLock<HashMap<Bytes, Entry>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: Bytes, value: Bytes, ttl_ms: Option<u64>) {
        let expires_at = ttl_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        let entry = Entry { data: value, expires_at };
        self.map.write().insert(key, entry);
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let now = Instant::now();
        {
            let guard = self.map.read();
            match guard.get(key) {
                Some(e) if e.is_live(now) => return Some(e.data.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired under the shared lock: re-check under the exclusive lock
        // before removing, since a racing SET may have just refreshed it.
        let mut guard = self.map.write();
        if let Some(e) = guard.get(key) {
            if e.is_live(Instant::now()) {
                return Some(e.data.clone());
            }
            guard.remove(key);
        }
        None
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let kv = KvStore::new();
        kv.set(Bytes::from_static(b"k"), Bytes::from_static(b"v"), None);
        assert_eq!(kv.get(b"k"), Some(Bytes::from_static(b"v")));
    }

    #[test]
    fn missing_key_is_none() {
        let kv = KvStore::new();
        assert_eq!(kv.get(b"nope"), None);
    }

    #[test]
    fn expired_key_reads_as_absent() {
        let kv = KvStore::new();
        kv.set(Bytes::from_static(b"k"), Bytes::from_static(b"v"), Some(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(kv.get(b"k"), None);
        assert!(!kv.contains(b"k"));
    }

    #[test]
    fn overwrite_replaces_value_and_ttl() {
        let kv = KvStore::new();
        kv.set(Bytes::from_static(b"k"), Bytes::from_static(b"v1"), Some(1));
        kv.set(Bytes::from_static(b"k"), Bytes::from_static(b"v2"), None);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(kv.get(b"k"), Some(Bytes::from_static(b"v2")));
    }
}
