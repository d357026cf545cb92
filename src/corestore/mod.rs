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

//! The typed store: three physically separate keyspaces sharing one
//! logical key namespace. A key present in more than one keyspace at once
//! would break `TYPE`'s contract, so every read/write path that expects a
//! specific keyspace calls [`Corestore::check_type`] first: it consults the
//! *other* two maps and, if either already holds the key, fails with
//! [`WRONGTYPE_MSG`] instead of letting the operation silently create or
//! read across keyspaces. `TYPE` itself is the one operation that doesn't
//! expect a type, so it skips the guard and consults all three maps
//! directly to answer.

pub mod kv;
pub mod list;
pub mod stream;

pub use kv::KvStore;
pub use list::ListStore;
pub use stream::StreamStore;

/// What kind of value, if any, currently lives at a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    None,
    String,
    List,
    Stream,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::String => "string",
            Self::List => "list",
            Self::Stream => "stream",
        }
    }
}

/// The reply text for a type-mismatch error (spec.md §7's Type mismatch
/// taxon): a key already exists, but holding a different kind of value
/// than the verb being dispatched expects.
pub const WRONGTYPE_MSG: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Default)]
pub struct Corestore {
    pub kv: KvStore,
    pub lists: ListStore,
    pub streams: StreamStore,
}

impl Corestore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `TYPE key` by consulting every keyspace, since a key's
    /// identity is the union of all three maps, not any single one of them.
    pub fn type_of(&self, key: &[u8]) -> KeyType {
        if self.kv.contains(key) {
            KeyType::String
        } else if self.lists.llen(key) > 0 {
            KeyType::List
        } else if self.streams.contains(key) {
            KeyType::Stream
        } else {
            KeyType::None
        }
    }

    /// Enforces the single-type-per-key invariant (spec.md §3) for a verb
    /// that expects `expected` at `key`. Absent keys always pass, since any
    /// keyspace is free to create them; a key already typed as something
    /// else fails with [`WRONGTYPE_MSG`] rather than letting the caller's
    /// keyspace silently read or write alongside it.
    pub fn check_type(&self, key: &[u8], expected: KeyType) -> Result<(), &'static str> {
        match self.type_of(key) {
            KeyType::None => Ok(()),
            actual if actual == expected => Ok(()),
            _ => Err(WRONGTYPE_MSG),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn type_of_consults_every_keyspace() {
        let store = Corestore::new();
        assert_eq!(store.type_of(b"x"), KeyType::None);

        store.kv.set(Bytes::from_static(b"s"), Bytes::from_static(b"v"), None);
        assert_eq!(store.type_of(b"s"), KeyType::String);

        store.lists.rpush(Bytes::from_static(b"l"), vec![Bytes::from_static(b"a")]);
        assert_eq!(store.type_of(b"l"), KeyType::List);

        store
            .streams
            .xadd(
                Bytes::from_static(b"st"),
                stream::IdSpec::Explicit(stream::StreamId { ms: 1, seq: 0 }),
                vec![(Bytes::from_static(b"f"), Bytes::from_static(b"v"))],
            )
            .unwrap();
        assert_eq!(store.type_of(b"st"), KeyType::Stream);
    }

    #[test]
    fn check_type_passes_absent_and_matching_keys() {
        let store = Corestore::new();
        assert!(store.check_type(b"x", KeyType::List).is_ok());

        store.kv.set(Bytes::from_static(b"s"), Bytes::from_static(b"v"), None);
        assert!(store.check_type(b"s", KeyType::String).is_ok());
    }

    #[test]
    fn check_type_rejects_a_key_of_a_different_kind() {
        let store = Corestore::new();
        store.kv.set(Bytes::from_static(b"s"), Bytes::from_static(b"v"), None);
        assert_eq!(store.check_type(b"s", KeyType::List), Err(WRONGTYPE_MSG));
        assert_eq!(store.check_type(b"s", KeyType::Stream), Err(WRONGTYPE_MSG));
    }
}
