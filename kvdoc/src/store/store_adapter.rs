use crate::errors::KvDocResult;
use crate::store::{Deadline, Expiry, KvStore, StoreValue};
use std::collections::BTreeSet;
use std::time::Duration;

/// The store as seen by one logical operation.
///
/// Every primitive is forwarded to the underlying [KvStore] after the operation's
/// [Deadline] has been checked. The adapter is created per operation and dropped with
/// it; it is cheap to create since [KvStore] is an `Arc` handle.
#[derive(Clone)]
pub struct StoreAdapter {
    store: KvStore,
    deadline: Deadline,
}

impl StoreAdapter {
    pub fn new(store: KvStore, deadline: Deadline) -> Self {
        StoreAdapter { store, deadline }
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    pub fn get_value(&self, key: &str) -> KvDocResult<Option<StoreValue>> {
        self.deadline.check("GET")?;
        log::trace!("GET {}", key);
        self.store.get_value(key)
    }

    pub fn set_value(&self, key: &str, value: StoreValue, expiry: Expiry) -> KvDocResult<()> {
        self.deadline.check("SET")?;
        log::trace!("SET {} ({:?})", key, expiry);
        self.store.set_value(key, value, expiry)
    }

    pub fn delete_value(&self, key: &str) -> KvDocResult<bool> {
        self.deadline.check("DEL")?;
        log::trace!("DEL {}", key);
        self.store.delete_value(key)
    }

    pub fn expire(&self, key: &str, ttl: Duration) -> KvDocResult<bool> {
        self.deadline.check("EXPIRE")?;
        log::trace!("EXPIRE {} {:?}", key, ttl);
        self.store.expire(key, ttl)
    }

    pub fn add_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool> {
        self.deadline.check("SADD")?;
        log::trace!("SADD {} {}", set_key, member);
        self.store.add_set_member(set_key, member)
    }

    pub fn remove_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool> {
        self.deadline.check("SREM")?;
        log::trace!("SREM {} {}", set_key, member);
        self.store.remove_set_member(set_key, member)
    }

    pub fn set_members(&self, set_key: &str) -> KvDocResult<BTreeSet<String>> {
        self.deadline.check("SMEMBERS")?;
        log::trace!("SMEMBERS {}", set_key);
        self.store.set_members(set_key)
    }

    pub fn intersect_sets(&self, set_keys: &[String]) -> KvDocResult<BTreeSet<String>> {
        self.deadline.check("SINTER")?;
        log::trace!("SINTER {:?}", set_keys);
        self.store.intersect_sets(set_keys)
    }

    pub fn union_sets(&self, set_keys: &[String]) -> KvDocResult<BTreeSet<String>> {
        self.deadline.check("SUNION")?;
        log::trace!("SUNION {:?}", set_keys);
        self.store.union_sets(set_keys)
    }

    pub fn list_keys_with_prefix(&self, prefix: &str) -> KvDocResult<Vec<String>> {
        self.deadline.check("KEYS")?;
        log::trace!("KEYS {}*", prefix);
        self.store.list_keys_with_prefix(prefix)
    }
}
