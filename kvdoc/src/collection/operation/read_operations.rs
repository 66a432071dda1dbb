use crate::codec::DocumentCodec;
use crate::collection::operation::{FindOptimizer, IndexManager, ItemFailure};
use crate::collection::{DocId, Document, DocumentCursor, FindOptions, FindPlan, ScanStrategy};
use crate::common::{doc_id_from_key, doc_key, doc_prefix};
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use crate::filter::Filter;
use crate::store::StoreAdapter;
use std::sync::Arc;

/// Documents matched by a query together with the ones that could not be read.
pub(crate) struct MatchSet {
    pub(crate) entries: Vec<(DocId, Document)>,
    pub(crate) failures: Vec<ItemFailure>,
}

#[derive(Clone)]
pub(crate) struct ReadOperations {
    inner: Arc<ReadOperationsInner>,
}

impl ReadOperations {
    pub fn new(
        key_prefix: &str,
        collection_name: &str,
        codec: DocumentCodec,
        index_manager: IndexManager,
        find_optimizer: FindOptimizer,
        read_repair: bool,
    ) -> Self {
        ReadOperations {
            inner: Arc::new(ReadOperationsInner {
                key_prefix: key_prefix.to_string(),
                collection_name: collection_name.to_string(),
                doc_prefix: doc_prefix(key_prefix, collection_name),
                codec,
                index_manager,
                find_optimizer,
                read_repair,
            }),
        }
    }

    pub fn doc_key(&self, id: &DocId) -> String {
        self.inner.doc_key(id)
    }

    pub fn explain(&self, filter: Filter, find_options: &FindOptions) -> FindPlan {
        self.inner.find_optimizer.create_find_plan(filter, find_options)
    }

    pub fn find(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        find_options: &FindOptions,
    ) -> KvDocResult<DocumentCursor> {
        self.inner.find(store, filter, find_options)
    }

    pub fn matching(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        limit: Option<usize>,
    ) -> KvDocResult<MatchSet> {
        let plan = self.explain(filter, &FindOptions::new());
        self.inner.execute(store, &plan, limit)
    }

    pub fn get_by_id(&self, store: &StoreAdapter, id: &DocId) -> KvDocResult<Option<Document>> {
        self.inner.fetch(store, id)
    }

    /// Ids of every stored document of the collection, in key order.
    pub fn all_ids(&self, store: &StoreAdapter) -> KvDocResult<Vec<DocId>> {
        self.inner.all_ids(store)
    }
}

struct ReadOperationsInner {
    key_prefix: String,
    collection_name: String,
    doc_prefix: String,
    codec: DocumentCodec,
    index_manager: IndexManager,
    find_optimizer: FindOptimizer,
    read_repair: bool,
}

impl ReadOperationsInner {
    fn doc_key(&self, id: &DocId) -> String {
        doc_key(&self.key_prefix, &self.collection_name, id.as_str())
    }

    fn find(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        find_options: &FindOptions,
    ) -> KvDocResult<DocumentCursor> {
        let plan = self.find_optimizer.create_find_plan(filter, find_options);

        // without sorting, candidate order is final and the scan can stop early
        let stop_after = match (find_options.has_sort(), find_options.limit) {
            (false, Some(limit)) => Some(find_options.skip.unwrap_or(0).saturating_add(limit)),
            _ => None,
        }
        .map(|count| usize::try_from(count).unwrap_or(usize::MAX));

        let matches = self.execute(store, &plan, stop_after)?;
        let mut documents = matches
            .entries
            .into_iter()
            .map(|(_, document)| document)
            .collect::<Vec<_>>();
        find_options.apply(&mut documents);

        Ok(DocumentCursor::new(documents, matches.failures, plan))
    }

    fn execute(
        &self,
        store: &StoreAdapter,
        plan: &FindPlan,
        stop_after: Option<usize>,
    ) -> KvDocResult<MatchSet> {
        let candidates = self.candidate_ids(store, plan)?;
        let repair = self.read_repair && !plan.index_probes().is_empty();

        let mut entries = Vec::new();
        let mut failures = Vec::new();
        for id in candidates {
            if stop_after.is_some_and(|limit| entries.len() >= limit) {
                break;
            }

            match self.fetch(store, &id) {
                Ok(Some(document)) => {
                    if repair {
                        self.evict_stale(store, &id, &document, plan);
                    }
                    if plan.filter().matches(&document) {
                        entries.push((id, document));
                    }
                }
                Ok(None) => {
                    if repair {
                        self.evict_dangling(store, &id, plan);
                    }
                }
                Err(err) if err.is_item_local() => {
                    log::warn!("Skipping document {}: {}", id, err);
                    failures.push(ItemFailure::new(id, err));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(MatchSet { entries, failures })
    }

    fn candidate_ids(&self, store: &StoreAdapter, plan: &FindPlan) -> KvDocResult<Vec<DocId>> {
        match plan.strategy() {
            ScanStrategy::IdLookup(ids) => Ok(ids.clone()),
            ScanStrategy::IndexIntersection(probes) => {
                self.index_manager.candidates(store, probes)
            }
            ScanStrategy::FullScan => self.all_ids(store),
        }
    }

    fn all_ids(&self, store: &StoreAdapter) -> KvDocResult<Vec<DocId>> {
        let keys = store.list_keys_with_prefix(&self.doc_prefix)?;
        let mut ids = Vec::with_capacity(keys.len());
        for key in keys {
            match doc_id_from_key(&self.doc_prefix, &key) {
                Some(id) => ids.push(DocId::from_canonical(id)),
                None => log::warn!("Ignoring malformed document key {}", key),
            }
        }
        Ok(ids)
    }

    fn fetch(&self, store: &StoreAdapter, id: &DocId) -> KvDocResult<Option<Document>> {
        let value = match store.get_value(&self.doc_key(id))? {
            Some(value) => value,
            None => return Ok(None),
        };

        match self.codec.decode(&value) {
            Ok(document) => Ok(Some(document)),
            Err(err) => {
                log::error!("Failed to decode document {} of {}", id, self.collection_name);
                Err(KvDocError::new_with_cause(
                    &format!("Failed to decode document {} of {}", id, self.collection_name),
                    ErrorKind::CorruptRecord,
                    err,
                ))
            }
        }
    }

    /// The record behind an index entry is gone: drop the id from every entry the
    /// plan consulted.
    fn evict_dangling(&self, store: &StoreAdapter, id: &DocId, plan: &FindPlan) {
        let keys = plan
            .index_probes()
            .iter()
            .flat_map(|probe| probe.keys().iter().cloned())
            .collect::<Vec<_>>();
        self.repair(store, id, &keys, "dangling");
    }

    /// The document no longer has a probed value: drop the id from that probe's
    /// entries.
    fn evict_stale(&self, store: &StoreAdapter, id: &DocId, document: &Document, plan: &FindPlan) {
        for probe in plan.index_probes() {
            let current = document.get(probe.field());
            if current.is_some_and(|value| probe.values().contains(value)) {
                continue;
            }
            self.repair(store, id, probe.keys(), "stale");
        }
    }

    /// Evicts `id` from `keys`, then re-reads the record and restores the memberships
    /// it holds by now. A write in flight adds memberships before its record lands,
    /// so the content fetched for the candidate may already be outdated.
    fn repair(&self, store: &StoreAdapter, id: &DocId, keys: &[String], reason: &str) {
        let evicted = match self.index_manager.evict(store, id, keys) {
            Ok(evicted) if evicted.is_empty() => return,
            Ok(evicted) => evicted,
            Err(err) => {
                log::warn!("Failed to evict {} id {}: {}", reason, id, err);
                return;
            }
        };

        let restored = match self.fetch(store, id) {
            Ok(Some(document)) => self.index_manager.restore(store, id, &document, &evicted),
            Ok(None) => Ok(0),
            Err(err) => {
                // cannot tell which memberships are wrong, put them all back
                log::warn!("Failed to re-read document {} after eviction: {}", id, err);
                self.index_manager.add_memberships(store, id, &evicted)
            }
        };

        match restored {
            Ok(restored) if restored == evicted.len() => {
                log::debug!("Kept index memberships of {}, its record changed meanwhile", id)
            }
            Ok(restored) => log::warn!(
                "Evicted {} id {} from {} index entries",
                reason,
                id,
                evicted.len() - restored
            ),
            Err(err) => log::warn!("Failed to restore index memberships of {}: {}", id, err),
        }
    }
}
