use crate::collection::operation::{CollectionOperations, WriteResult};
use crate::collection::{DocId, Document, DocumentCursor, FindOptions, FindPlan, UpdateOptions};
use crate::common::Value;
use crate::errors::KvDocResult;
use crate::filter::{Filter, FilterSpec};
use crate::repository_config::RepositoryConfig;
use crate::store::{Deadline, KvStore, StoreAdapter};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// A named set of documents sharing one id field and one index configuration.
///
/// Handles are cheap to clone and safe to share across threads. There is no
/// client-side locking: every operation is a sequence of store primitives, each atomic
/// on its own, ordered so that a completed write is never left missing from the
/// index entries of its values (see [Collection::find]). A read racing a write or a
/// read repair may briefly miss the document being written.
///
/// Every operation runs under a [Deadline] derived from the collection timeout
/// ([Collection::with_timeout], else the repository's operation timeout). Once the
/// deadline passes, remaining store calls fail with `ErrorKind::StoreTimeout`.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Collection {
    pub(crate) fn new(
        name: &str,
        id_field: &str,
        config: &RepositoryConfig,
        store: KvStore,
    ) -> Self {
        Collection {
            inner: Arc::new(CollectionInner {
                name: name.to_string(),
                id_field: id_field.to_string(),
                store,
                operations: CollectionOperations::new(name, id_field, config),
                timeout: config.operation_timeout(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id_field(&self) -> &str {
        &self.inner.id_field
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Returns a handle on the same collection whose operations run under `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Collection {
        Collection {
            inner: Arc::new(CollectionInner {
                name: self.inner.name.clone(),
                id_field: self.inner.id_field.clone(),
                store: self.inner.store.clone(),
                operations: self.inner.operations.clone(),
                timeout: Some(timeout),
            }),
        }
    }

    /// Inserts or replaces a document, keyed by its id field.
    ///
    /// The document expires after the repository's default TTL if one is configured.
    /// Setting the same document twice leaves the collection unchanged.
    ///
    /// # Errors
    ///
    /// * `InvalidDocument` if the id field is missing or not a string or an integer
    /// * `StoreUnavailable`/`StoreTimeout` if the store fails; memberships written
    ///   before the failure are harmless and repaired by later reads
    pub fn set(&self, document: &Document) -> KvDocResult<DocId> {
        let store = self.inner.adapter();
        self.inner.operations.set(&store, document, None)
    }

    /// Like [Collection::set] with an explicit time to live for this document.
    pub fn set_with_ttl(&self, document: &Document, ttl: Duration) -> KvDocResult<DocId> {
        let store = self.inner.adapter();
        self.inner.operations.set(&store, document, Some(ttl))
    }

    /// Finds every document matching `filter`.
    ///
    /// Index lookups only narrow the candidates; each candidate is read and checked
    /// against the whole filter, so stale or dangling index entries never show up in
    /// the result. Documents that could not be read are listed in
    /// [DocumentCursor::failures].
    ///
    /// # Errors
    ///
    /// `InvalidOperator` for a malformed filter, raised before the store is touched.
    pub fn find(&self, filter: FilterSpec) -> KvDocResult<DocumentCursor> {
        self.find_with_options(filter, &FindOptions::default())
    }

    pub fn find_with_options(
        &self,
        filter: FilterSpec,
        find_options: &FindOptions,
    ) -> KvDocResult<DocumentCursor> {
        let filter = Filter::compile(&filter)?;
        let store = self.inner.adapter();
        self.inner.operations.find(&store, filter, find_options)
    }

    /// Returns the first document matching `filter`, if any.
    pub fn find_one(&self, filter: FilterSpec) -> KvDocResult<Option<Document>> {
        let mut cursor = self.find_with_options(filter, &FindOptions::new().limit(1))?;
        Ok(cursor.next())
    }

    /// Reads a document by id without going through a filter.
    pub fn get_by_id<T: Into<Value>>(&self, id: T) -> KvDocResult<Option<Document>> {
        let id = DocId::from_value(&id.into())?;
        let store = self.inner.adapter();
        self.inner.operations.get_by_id(&store, &id)
    }

    pub fn count(&self, filter: FilterSpec) -> KvDocResult<usize> {
        Ok(self.find(filter)?.size())
    }

    /// Plans `filter` without running it.
    pub fn explain(&self, filter: FilterSpec) -> KvDocResult<FindPlan> {
        let filter = Filter::compile(&filter)?;
        Ok(self.inner.operations.explain(filter, &FindOptions::default()))
    }

    /// Merges `patch` into every document matching `filter`.
    ///
    /// The patch is shallow: its fields overwrite or add to the stored ones. A document's
    /// remaining time to live is preserved. Each match is updated on its own; documents
    /// that fail are reported in [WriteResult::failures] while the others are updated.
    ///
    /// # Errors
    ///
    /// * `InvalidOperator` for a malformed filter
    /// * `InvalidDocument` if the patch contains the id field or an invalid field name
    ///
    /// Both are raised before the store is touched.
    pub fn update(&self, filter: FilterSpec, patch: &Document) -> KvDocResult<WriteResult> {
        self.update_with_options(filter, patch, &UpdateOptions::default())
    }

    pub fn update_with_options(
        &self,
        filter: FilterSpec,
        patch: &Document,
        update_options: &UpdateOptions,
    ) -> KvDocResult<WriteResult> {
        let filter = Filter::compile(&filter)?;
        let store = self.inner.adapter();
        self.inner
            .operations
            .update(&store, filter, patch, update_options.is_just_once())
    }

    /// Deletes every document matching `filter` together with its index memberships.
    pub fn delete(&self, filter: FilterSpec) -> KvDocResult<WriteResult> {
        self.remove(filter, false)
    }

    /// Deletes the first document matching `filter`.
    pub fn delete_one(&self, filter: FilterSpec) -> KvDocResult<WriteResult> {
        self.remove(filter, true)
    }

    /// Repairs every index entry of the collection from the stored documents.
    ///
    /// Reads repair drift lazily as they come across it; this walks the whole
    /// collection instead, e.g. after documents expired or a process crashed mid-write.
    pub fn reconcile_indexes(&self) -> KvDocResult<WriteResult> {
        let store = self.inner.adapter();
        self.inner.operations.reconcile(&store)
    }

    /// Lists the index entries of `field` as `(canonical value, ids)` pairs.
    ///
    /// Entries are returned as stored, including memberships not yet repaired.
    pub fn index_entries(&self, field: &str) -> KvDocResult<Vec<(String, BTreeSet<DocId>)>> {
        let store = self.inner.adapter();
        self.inner.operations.index_entries(&store, field)
    }

    /// Deletes every document and index entry of the collection.
    pub fn clear(&self) -> KvDocResult<WriteResult> {
        let store = self.inner.adapter();
        self.inner.operations.clear(&store)
    }

    fn remove(&self, filter: FilterSpec, just_once: bool) -> KvDocResult<WriteResult> {
        let filter = Filter::compile(&filter)?;
        let store = self.inner.adapter();
        self.inner.operations.delete(&store, filter, just_once)
    }
}

struct CollectionInner {
    name: String,
    id_field: String,
    store: KvStore,
    operations: CollectionOperations,
    timeout: Option<Duration>,
}

impl CollectionInner {
    fn adapter(&self) -> StoreAdapter {
        StoreAdapter::new(self.store.clone(), Deadline::from_timeout(self.timeout))
    }
}
