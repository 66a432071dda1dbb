use crate::errors::KvDocResult;
use crate::store::{Expiry, StoreValue};
use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// Primitive operations of the backing key-value store.
///
/// # Purpose
/// Defines the contract a backend must fulfil for the document layer to run on top of
/// it. Every call is expected to be atomic at the store level; nothing above this
/// trait assumes atomicity across calls.
///
/// # Semantics
/// - Sets are created on first add and vanish when their last member is removed.
/// - Missing keys read as `None` or as an empty set, never as an error.
/// - Unreachable or failing backends report `ErrorKind::StoreUnavailable`.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; a single provider is shared by every collection.
pub trait KvStoreProvider: Send + Sync {
    /// Reads the value stored at `key`.
    fn get_value(&self, key: &str) -> KvDocResult<Option<StoreValue>>;

    /// Writes `value` at `key`, replacing any previous value.
    fn set_value(&self, key: &str, value: StoreValue, expiry: Expiry) -> KvDocResult<()>;

    /// Deletes the value at `key`. Returns `true` if something was deleted.
    fn delete_value(&self, key: &str) -> KvDocResult<bool>;

    /// Sets a time to live on an existing value. Returns `false` if the key is absent.
    fn expire(&self, key: &str, ttl: Duration) -> KvDocResult<bool>;

    /// Adds `member` to the set at `set_key`. Returns `true` if it was not present.
    fn add_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool>;

    /// Removes `member` from the set at `set_key`. Returns `true` if it was present.
    fn remove_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool>;

    /// Returns every member of the set at `set_key`.
    fn set_members(&self, set_key: &str) -> KvDocResult<BTreeSet<String>>;

    /// Returns the members common to all the given sets.
    ///
    /// An empty key list yields an empty set.
    fn intersect_sets(&self, set_keys: &[String]) -> KvDocResult<BTreeSet<String>>;

    /// Returns the members of any of the given sets.
    fn union_sets(&self, set_keys: &[String]) -> KvDocResult<BTreeSet<String>> {
        let mut union = BTreeSet::new();
        for set_key in set_keys {
            union.extend(self.set_members(set_key)?);
        }
        Ok(union)
    }

    /// Lists every live key starting with `prefix`, in key order.
    ///
    /// This is a full key space walk; it backs scan fallback and maintenance only.
    fn list_keys_with_prefix(&self, prefix: &str) -> KvDocResult<Vec<String>>;
}

/// Cloneable handle over a [KvStoreProvider].
///
/// Cloning is cheap, every clone shares the same provider.
#[derive(Clone)]
pub struct KvStore {
    inner: Arc<dyn KvStoreProvider>,
}

impl KvStore {
    pub fn new<T: KvStoreProvider + 'static>(inner: T) -> Self {
        KvStore {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for KvStore {
    type Target = Arc<dyn KvStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn test_union_sets_default() {
        let store = KvStore::new(InMemoryStore::new());
        store.add_set_member("a", "1").unwrap();
        store.add_set_member("a", "2").unwrap();
        store.add_set_member("b", "2").unwrap();
        store.add_set_member("b", "3").unwrap();

        let union = store
            .union_sets(&["a".to_string(), "b".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(union.into_iter().collect::<Vec<_>>(), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_handle_clones_share_provider() {
        let store = KvStore::new(InMemoryStore::new());
        let clone = store.clone();
        store
            .set_value("k", StoreValue::Blob(vec![7]), Expiry::Never)
            .unwrap();
        assert_eq!(
            clone.get_value("k").unwrap(),
            Some(StoreValue::Blob(vec![7]))
        );
    }
}
