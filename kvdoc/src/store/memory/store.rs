use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use crate::store::{Expiry, KvStoreProvider, StoreValue};
use crossbeam_skiplist::SkipMap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::ops::Bound::{Included, Unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// In-memory key-value store with Redis-like semantics.
///
/// # Purpose
/// `InMemoryStore` backs collections entirely in process memory. It is the reference
/// implementation of [KvStoreProvider] and the store used by tests.
///
/// # Characteristics
/// - **Thread-Safe**: Cloning shares the same data across threads
/// - **Ordered Keys**: Plain values live in a concurrent skip list, so prefix listing
///   walks keys in order
/// - **Lazy Expiry**: Values with a time to live disappear on the first access after
///   they expire
/// - **Self-Cleaning Sets**: A set is removed as soon as its last member is removed
/// - **Closable**: After [InMemoryStore::close] every call fails with
///   `ErrorKind::StoreUnavailable`, which makes it usable for outage tests
///
/// # Usage
/// ```text
/// let store = KvStore::new(InMemoryStore::new());
/// store.add_set_member("users:idx:role:s\\:CTO", "n:1")?;
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner::new()),
        }
    }

    /// Closes the store. Every later call fails with `StoreUnavailable`.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Relaxed);
    }

    /// Reopens a closed store; data written before closing is still there.
    pub fn reopen(&self) {
        self.inner.closed.store(false, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }

    /// Remaining time to live of the value at `key`, `None` if it does not expire
    /// or does not exist.
    pub fn ttl(&self, key: &str) -> KvDocResult<Option<Duration>> {
        self.inner.ttl(key)
    }
}

impl KvStoreProvider for InMemoryStore {
    fn get_value(&self, key: &str) -> KvDocResult<Option<StoreValue>> {
        self.inner.get_value(key)
    }

    fn set_value(&self, key: &str, value: StoreValue, expiry: Expiry) -> KvDocResult<()> {
        self.inner.set_value(key, value, expiry)
    }

    fn delete_value(&self, key: &str) -> KvDocResult<bool> {
        self.inner.delete_value(key)
    }

    fn expire(&self, key: &str, ttl: Duration) -> KvDocResult<bool> {
        self.inner.expire(key, ttl)
    }

    fn add_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool> {
        self.inner.add_set_member(set_key, member)
    }

    fn remove_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool> {
        self.inner.remove_set_member(set_key, member)
    }

    fn set_members(&self, set_key: &str) -> KvDocResult<BTreeSet<String>> {
        self.inner.set_members(set_key)
    }

    fn intersect_sets(&self, set_keys: &[String]) -> KvDocResult<BTreeSet<String>> {
        self.inner.intersect_sets(set_keys)
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> KvDocResult<Vec<String>> {
        self.inner.list_keys_with_prefix(prefix)
    }
}

#[derive(Clone)]
struct StoredEntry {
    value: StoreValue,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }
}

#[derive(Default)]
struct InMemoryStoreInner {
    values: SkipMap<String, StoredEntry>,
    sets: DashMap<String, BTreeSet<String>>,
    closed: AtomicBool,
}

impl InMemoryStoreInner {
    fn new() -> InMemoryStoreInner {
        InMemoryStoreInner {
            values: SkipMap::new(),
            sets: DashMap::new(),
            closed: AtomicBool::from(false),
        }
    }

    fn check_opened(&self) -> KvDocResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("In-memory store is closed");
            return Err(KvDocError::new(
                "In-memory store is closed",
                ErrorKind::StoreUnavailable,
            ));
        }
        Ok(())
    }

    /// Returns the live entry at `key`, evicting it if it has expired.
    fn live_entry(&self, key: &str) -> Option<StoredEntry> {
        let entry = self.values.get(key)?;
        let stored = entry.value().clone();
        if stored.is_expired(Instant::now()) {
            entry.remove();
            return None;
        }
        Some(stored)
    }

    fn get_value(&self, key: &str) -> KvDocResult<Option<StoreValue>> {
        self.check_opened()?;
        Ok(self.live_entry(key).map(|stored| stored.value))
    }

    fn set_value(&self, key: &str, value: StoreValue, expiry: Expiry) -> KvDocResult<()> {
        self.check_opened()?;
        let expires_at = match expiry {
            Expiry::Never => None,
            Expiry::After(ttl) => Some(Instant::now() + ttl),
            Expiry::Keep => self.live_entry(key).and_then(|stored| stored.expires_at),
        };

        // a plain write replaces a key of any type
        self.sets.remove(key);
        self.values
            .insert(key.to_string(), StoredEntry { value, expires_at });
        Ok(())
    }

    fn delete_value(&self, key: &str) -> KvDocResult<bool> {
        self.check_opened()?;
        let value_removed = match self.values.remove(key) {
            Some(entry) => !entry.value().is_expired(Instant::now()),
            None => false,
        };
        let set_removed = self.sets.remove(key).is_some();
        Ok(value_removed || set_removed)
    }

    fn expire(&self, key: &str, ttl: Duration) -> KvDocResult<bool> {
        self.check_opened()?;
        match self.live_entry(key) {
            Some(stored) => {
                self.values.insert(
                    key.to_string(),
                    StoredEntry {
                        value: stored.value,
                        expires_at: Some(Instant::now() + ttl),
                    },
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn ttl(&self, key: &str) -> KvDocResult<Option<Duration>> {
        self.check_opened()?;
        Ok(self.live_entry(key).and_then(|stored| {
            stored
                .expires_at
                .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
        }))
    }

    fn check_not_value(&self, key: &str) -> KvDocResult<()> {
        if self.live_entry(key).is_some() {
            log::error!("Key {} holds a plain value, not a set", key);
            return Err(KvDocError::new(
                &format!("Key {} holds a plain value, not a set", key),
                ErrorKind::StoreUnavailable,
            ));
        }
        Ok(())
    }

    fn add_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool> {
        self.check_opened()?;
        self.check_not_value(set_key)?;
        let mut set = self.sets.entry(set_key.to_string()).or_default();
        Ok(set.insert(member.to_string()))
    }

    fn remove_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool> {
        self.check_opened()?;
        match self.sets.entry(set_key.to_string()) {
            Entry::Occupied(mut entry) => {
                let removed = entry.get_mut().remove(member);
                if entry.get().is_empty() {
                    entry.remove();
                }
                Ok(removed)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    fn set_members(&self, set_key: &str) -> KvDocResult<BTreeSet<String>> {
        self.check_opened()?;
        Ok(self
            .sets
            .get(set_key)
            .map(|set| set.value().clone())
            .unwrap_or_default())
    }

    fn intersect_sets(&self, set_keys: &[String]) -> KvDocResult<BTreeSet<String>> {
        self.check_opened()?;
        let mut sets = Vec::with_capacity(set_keys.len());
        for set_key in set_keys {
            match self.sets.get(set_key) {
                Some(set) => sets.push(set.value().clone()),
                // a missing set is empty, so is the intersection
                None => return Ok(BTreeSet::new()),
            }
        }

        sets.sort_by_key(|set| set.len());
        let mut sets = sets.into_iter();
        let mut result = match sets.next() {
            Some(smallest) => smallest,
            None => return Ok(BTreeSet::new()),
        };
        for set in sets {
            result.retain(|member| set.contains(member));
            if result.is_empty() {
                break;
            }
        }
        Ok(result)
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> KvDocResult<Vec<String>> {
        self.check_opened()?;
        let now = Instant::now();
        let value_keys = self
            .values
            .range::<str, _>((Included(prefix), Unbounded))
            .take_while(|entry| entry.key().starts_with(prefix))
            .filter(|entry| !entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();

        let set_keys = self
            .sets
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .sorted()
            .collect::<Vec<_>>();

        Ok(value_keys.into_iter().merge(set_keys).collect())
    }
}
