use crate::collection::{DocId, Document, IndexProbe};
use crate::common::{field_index_prefix, index_key, index_prefix, unescape_component, Value};
use crate::errors::KvDocResult;
use crate::store::StoreAdapter;
use itertools::Itertools;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Index memberships a write moves, as index entry keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReindexPlan {
    additions: Vec<String>,
    removals: Vec<String>,
}

impl ReindexPlan {
    pub fn additions(&self) -> &[String] {
        &self.additions
    }

    pub fn removals(&self) -> &[String] {
        &self.removals
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// Maintains the per-field indexes of one collection.
///
/// An index entry is a store-level set keyed by `(collection, field, value)` whose
/// members are the ids of the documents having `field == value`. Only the configured
/// indexed fields get entries; every other field can only be found by scanning.
///
/// Writes keep entries consistent in an order that only ever leaves *extra*
/// memberships behind when interrupted. Reads mask those by re-checking documents,
/// and [IndexManager::evict] removes them once discovered. An eviction is followed
/// by a fresh read of the record and [IndexManager::restore], since a concurrent
/// write may have made the membership valid again.
#[derive(Clone)]
pub(crate) struct IndexManager {
    inner: Arc<IndexManagerInner>,
}

impl IndexManager {
    pub fn new(key_prefix: &str, collection_name: &str, indexed_fields: BTreeSet<String>) -> Self {
        IndexManager {
            inner: Arc::new(IndexManagerInner {
                key_prefix: key_prefix.to_string(),
                collection_name: collection_name.to_string(),
                indexed_fields,
            }),
        }
    }

    pub fn is_indexed(&self, field: &str) -> bool {
        self.inner.indexed_fields.contains(field)
    }

    /// Key of the index entry for `field == value`.
    pub fn index_key(&self, field: &str, value: &Value) -> String {
        index_key(
            &self.inner.key_prefix,
            &self.inner.collection_name,
            field,
            &value.canonical(),
        )
    }

    /// Prefix shared by every index entry of the collection.
    pub fn index_prefix(&self) -> String {
        index_prefix(&self.inner.key_prefix, &self.inner.collection_name)
    }

    /// Prefix shared by every index entry of one field.
    pub fn field_prefix(&self, field: &str) -> String {
        field_index_prefix(&self.inner.key_prefix, &self.inner.collection_name, field)
    }

    /// Index entry keys a document belongs to, one per indexed field it carries.
    pub fn entry_keys(&self, document: &Document) -> Vec<String> {
        self.inner
            .indexed_fields
            .iter()
            .filter_map(|field| document.get(field).map(|value| self.index_key(field, value)))
            .collect()
    }

    /// Builds an index probe for an equality or membership predicate.
    pub fn probe(&self, field: &str, values: &[Value]) -> IndexProbe {
        let mut seen = HashSet::new();
        let mut distinct_values = Vec::with_capacity(values.len());
        let mut keys = Vec::with_capacity(values.len());
        for value in values {
            let key = self.index_key(field, value);
            if seen.insert(key.clone()) {
                distinct_values.push(value.clone());
                keys.push(key);
            }
        }
        IndexProbe::new(field, distinct_values, keys)
    }

    pub fn add_to_index(
        &self,
        store: &StoreAdapter,
        field: &str,
        value: &Value,
        id: &DocId,
    ) -> KvDocResult<bool> {
        store.add_set_member(&self.index_key(field, value), id.as_str())
    }

    pub fn remove_from_index(
        &self,
        store: &StoreAdapter,
        field: &str,
        value: &Value,
        id: &DocId,
    ) -> KvDocResult<bool> {
        store.remove_set_member(&self.index_key(field, value), id.as_str())
    }

    /// Adds `id` to the entry of every indexed field present in `document`.
    pub fn index_document(&self, store: &StoreAdapter, id: &DocId, document: &Document) -> KvDocResult<()> {
        for field in self.inner.indexed_fields.iter() {
            if let Some(value) = document.get(field) {
                self.add_to_index(store, field, value, id)?;
            }
        }
        Ok(())
    }

    /// Removes `id` from the entry of every indexed field present in `document`.
    pub fn unindex_document(&self, store: &StoreAdapter, id: &DocId, document: &Document) -> KvDocResult<()> {
        for field in self.inner.indexed_fields.iter() {
            if let Some(value) = document.get(field) {
                self.remove_from_index(store, field, value, id)?;
            }
        }
        Ok(())
    }

    /// Computes the memberships to move when `old` is replaced by `new`.
    ///
    /// Only indexed fields whose value changed contribute; a field that appears gets
    /// an addition only, a field that disappears a removal only.
    pub fn plan_reindex(&self, old: Option<&Document>, new: &Document) -> ReindexPlan {
        let mut plan = ReindexPlan::default();
        for field in self.inner.indexed_fields.iter() {
            let old_value = old.and_then(|doc| doc.get(field));
            let new_value = new.get(field);
            let old_key = old_value.map(|value| self.index_key(field, value));
            let new_key = new_value.map(|value| self.index_key(field, value));
            if old_key == new_key {
                continue;
            }
            if let Some(key) = new_key {
                plan.additions.push(key);
            }
            if let Some(key) = old_key {
                plan.removals.push(key);
            }
        }
        plan
    }

    pub fn apply_additions(&self, store: &StoreAdapter, id: &DocId, plan: &ReindexPlan) -> KvDocResult<()> {
        self.add_memberships(store, id, &plan.additions)?;
        Ok(())
    }

    /// Adds `id` to each of the given index entries, returning how many lacked it.
    pub fn add_memberships(&self, store: &StoreAdapter, id: &DocId, keys: &[String]) -> KvDocResult<usize> {
        let mut added = 0;
        for key in keys {
            if store.add_set_member(key, id.as_str())? {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn apply_removals(&self, store: &StoreAdapter, id: &DocId, plan: &ReindexPlan) -> KvDocResult<()> {
        for key in &plan.removals {
            store.remove_set_member(key, id.as_str())?;
        }
        Ok(())
    }

    /// Resolves index probes to candidate ids.
    ///
    /// When every probe is single valued a single intersection answers the query.
    /// Otherwise each probe's values are unioned first and the resulting sets are
    /// intersected smallest first.
    pub fn candidates(&self, store: &StoreAdapter, probes: &[IndexProbe]) -> KvDocResult<Vec<DocId>> {
        if probes.is_empty() {
            return Ok(Vec::new());
        }

        let members = if probes.iter().all(IndexProbe::is_single_valued) {
            let keys = probes
                .iter()
                .flat_map(|probe| probe.keys().iter().cloned())
                .unique()
                .collect::<Vec<_>>();
            store.intersect_sets(&keys)?
        } else {
            let mut sets = Vec::with_capacity(probes.len());
            for probe in probes {
                let set = match probe.keys() {
                    [] => BTreeSet::new(),
                    [key] => store.set_members(key)?,
                    keys => store.union_sets(keys)?,
                };
                if set.is_empty() {
                    return Ok(Vec::new());
                }
                sets.push(set);
            }
            intersect_smallest_first(sets)
        };

        Ok(members.into_iter().map(DocId::from_canonical).collect())
    }

    /// Removes `id` from each of the given index entries.
    ///
    /// Returns the keys of the entries that actually held the id.
    pub fn evict(&self, store: &StoreAdapter, id: &DocId, keys: &[String]) -> KvDocResult<Vec<String>> {
        let mut evicted = Vec::new();
        for key in keys {
            if store.remove_set_member(key, id.as_str())? {
                evicted.push(key.clone());
            }
        }
        Ok(evicted)
    }

    /// Adds `id` back to those of `keys` that `document` belongs to.
    ///
    /// Returns the number of memberships restored.
    pub fn restore(
        &self,
        store: &StoreAdapter,
        id: &DocId,
        document: &Document,
        keys: &[String],
    ) -> KvDocResult<usize> {
        let mut restored = 0;
        for key in self.entry_keys(document) {
            if keys.contains(&key) && store.add_set_member(&key, id.as_str())? {
                restored += 1;
            }
        }
        Ok(restored)
    }

    /// Lists the entries of `field` as `(canonical value, members)`, ordered by key.
    pub fn entries(
        &self,
        store: &StoreAdapter,
        field: &str,
    ) -> KvDocResult<Vec<(String, BTreeSet<DocId>)>> {
        let prefix = self.field_prefix(field);
        let mut entries = Vec::new();
        for key in store.list_keys_with_prefix(&prefix)? {
            let Some(value) = key.strip_prefix(&prefix).and_then(unescape_component) else {
                log::warn!("Ignoring malformed index key {}", key);
                continue;
            };
            let members = store
                .set_members(&key)?
                .into_iter()
                .map(DocId::from_canonical)
                .collect::<BTreeSet<_>>();
            if !members.is_empty() {
                entries.push((value, members));
            }
        }
        Ok(entries)
    }
}

fn intersect_smallest_first(mut sets: Vec<BTreeSet<String>>) -> BTreeSet<String> {
    sets.sort_by_key(|set| set.len());
    let mut sets = sets.into_iter();
    let mut result = sets.next().unwrap_or_default();
    for set in sets {
        result.retain(|member| set.contains(member));
        if result.is_empty() {
            break;
        }
    }
    result
}

struct IndexManagerInner {
    key_prefix: String,
    collection_name: String,
    indexed_fields: BTreeSet<String>,
}
