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

//! The list keyspace, including the `BLPOP` blocking-rendezvous subsystem.
//!
//! Each key owns one [`ListData`]: its elements *and* its FIFO queue of
//! waiters, both behind the same lock. A push that finds a waiter queued
//! hands the popped element to it directly (`push_and_wake`) rather than
//! leaving the element in the list for the waiter to find later — this is
//! what lets `BLPOP` observe a length of zero immediately after a
//! hand-off. A `BLPOP` caller passing `timeout = None` waits forever; the
//! dispatcher is responsible for mapping a zero-second request timeout to
//! `None`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Bytes>,
}

#[derive(Default)]
struct ListData {
    elements: VecDeque<Bytes>,
    waiters: VecDeque<Waiter>,
}

pub struct ListStore {
    map: Mutex<HashMap<Bytes, ListData>>,
    next_waiter_id: AtomicU64,
}

impl Default for ListStore {
    fn default() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
            next_waiter_id: AtomicU64::new(1),
        }
    }
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rpush(&self, key: Bytes, values: Vec<Bytes>) -> i64 {
        self.push_and_wake(key, values, false)
    }

    pub fn lpush(&self, key: Bytes, values: Vec<Bytes>) -> i64 {
        self.push_and_wake(key, values, true)
    }

    fn push_and_wake(&self, key: Bytes, values: Vec<Bytes>, to_front: bool) -> i64 {
        let mut map = self.map.lock();
        let entry = map.entry(key.clone()).or_default();
        if to_front {
            for v in values {
                entry.elements.push_front(v);
            }
        } else {
            for v in values {
                entry.elements.push_back(v);
            }
        }
        // Hand off to queued waiters FIFO. A send can fail if the waiter
        // abandoned between enqueueing and now; if so, the element goes
        // back to the head and we try the next waiter in line against it.
        while !entry.elements.is_empty() && !entry.waiters.is_empty() {
            let waiter = entry.waiters.pop_front().unwrap();
            let elem = entry.elements.pop_front().unwrap();
            if let Err(unsent) = waiter.tx.send(elem) {
                entry.elements.push_front(unsent);
            }
        }
        let len = entry.elements.len() as i64;
        if entry.elements.is_empty() && entry.waiters.is_empty() {
            map.remove(&key);
        }
        len
    }

    pub fn lpop(&self, key: &[u8], count: usize) -> Vec<Bytes> {
        let mut map = self.map.lock();
        let entry = match map.get_mut(key) {
            Some(e) => e,
            None => return Vec::new(),
        };
        let mut popped = Vec::with_capacity(count.min(entry.elements.len()));
        for _ in 0..count {
            match entry.elements.pop_front() {
                Some(v) => popped.push(v),
                None => break,
            }
        }
        if entry.elements.is_empty() && entry.waiters.is_empty() {
            map.remove(key);
        }
        popped
    }

    pub fn llen(&self, key: &[u8]) -> i64 {
        self.map
            .lock()
            .get(key)
            .map(|e| e.elements.len() as i64)
            .unwrap_or(0)
    }

    pub fn lrange(&self, key: &[u8], start: i64, end: i64) -> Vec<Bytes> {
        let map = self.map.lock();
        let entry = match map.get(key) {
            Some(e) => e,
            None => return Vec::new(),
        };
        let len = entry.elements.len() as i64;
        if len == 0 {
            return Vec::new();
        }
        let start = if start < 0 { (len + start).max(0) } else { start };
        let mut end = if end < 0 { len + end } else { end };
        if end >= len {
            end = len - 1;
        }
        if start > end || start >= len || end < 0 {
            return Vec::new();
        }
        entry
            .elements
            .iter()
            .skip(start as usize)
            .take((end - start + 1) as usize)
            .cloned()
            .collect()
    }

    fn try_pop_front(&self, key: &[u8]) -> Option<Bytes> {
        let mut map = self.map.lock();
        let entry = map.get_mut(key)?;
        let v = entry.elements.pop_front();
        if v.is_some() && entry.elements.is_empty() && entry.waiters.is_empty() {
            map.remove(key);
        }
        v
    }

    /// `BLPOP`. `timeout = None` waits until an element arrives with no
    /// deadline; `Some(d)` gives up after `d` and returns `None`.
    pub async fn blpop(&self, key: Bytes, timeout: Option<Duration>) -> Option<Bytes> {
        if let Some(v) = self.try_pop_front(&key) {
            return Some(v);
        }
        let id = self.next_waiter_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut map = self.map.lock();
            map.entry(key.clone())
                .or_default()
                .waiters
                .push_back(Waiter { id, tx });
        }
        let mut waiter = BlpopWaiter {
            store: self,
            key,
            id,
            rx,
            resolved: false,
        };
        let outcome = match timeout {
            None => (&mut waiter.rx).await.ok(),
            Some(dur) => {
                tokio::select! {
                    res = &mut waiter.rx => res.ok(),
                    _ = tokio::time::sleep(dur) => waiter.recover_on_timeout(),
                }
            }
        };
        waiter.resolved = true;
        outcome
    }
}

/// Owns one outstanding `BLPOP` registration. Its `Drop` impl guarantees
/// the conservation invariant ("no element ever delivered twice nor lost")
/// even when the future is cancelled outright (client disconnects, the
/// enclosing task is aborted) rather than completing through `blpop`'s own
/// timeout path.
struct BlpopWaiter<'a> {
    store: &'a ListStore,
    key: Bytes,
    id: u64,
    rx: oneshot::Receiver<Bytes>,
    resolved: bool,
}

impl BlpopWaiter<'_> {
    fn recover_on_timeout(&mut self) -> Option<Bytes> {
        purge_or_recover(&self.store.map, &self.key, self.id, &mut self.rx)
    }
}

impl Drop for BlpopWaiter<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        // Cancelled mid-wait. Recover a value that raced past us, if any,
        // and put it back rather than let it vanish with this waiter.
        if let Some(value) = purge_or_recover(&self.store.map, &self.key, self.id, &mut self.rx) {
            let mut map = self.store.map.lock();
            map.entry(self.key.clone())
                .or_default()
                .elements
                .push_front(value);
        }
    }
}

/// Remove waiter `id` from `key`'s queue. If it was still queued, nothing
/// was sent to it and `None` is returned. If it was already gone, a
/// producer raced past us under the same lock and already called `send`
/// before we got here, so the value is waiting in `rx` and is fetched with
/// a non-blocking receive.
fn purge_or_recover(
    map: &Mutex<HashMap<Bytes, ListData>>,
    key: &[u8],
    id: u64,
    rx: &mut oneshot::Receiver<Bytes>,
) -> Option<Bytes> {
    let mut guard = map.lock();
    let removed = match guard.get_mut(key) {
        Some(entry) => {
            let before = entry.waiters.len();
            entry.waiters.retain(|w| w.id != id);
            let removed = entry.waiters.len() != before;
            if entry.elements.is_empty() && entry.waiters.is_empty() {
                guard.remove(key);
            }
            removed
        }
        None => false,
    };
    drop(guard);
    if removed {
        None
    } else {
        rx.try_recv().ok()
    }
}
