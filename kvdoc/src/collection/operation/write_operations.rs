use crate::codec::DocumentCodec;
use crate::collection::operation::{IndexManager, ItemFailure, ReadOperations, WriteResult};
use crate::collection::{validate_field_name, DocId, Document};
use crate::common::split_index_key;
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use crate::filter::Filter;
use crate::store::{Expiry, StoreAdapter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Write path of a collection.
///
/// Primitive calls are ordered so that an interruption at any point leaves at most
/// extra index memberships or dangling ids behind, never a stored document missing
/// from an index entry it belongs to:
///
/// - insert: add memberships, persist the record, add the memberships again
/// - replace/update: add new memberships, persist, add them again, then remove old
///   memberships
/// - delete: remove the record, then its memberships
///
/// The second addition covers a read repair that ran between the first addition and
/// the record write, saw the previous content and evicted the new memberships.
#[derive(Clone)]
pub(crate) struct WriteOperations {
    inner: Arc<WriteOperationsInner>,
}

impl WriteOperations {
    pub fn new(
        id_field: &str,
        codec: DocumentCodec,
        index_manager: IndexManager,
        read_operations: ReadOperations,
        default_ttl: Option<Duration>,
    ) -> Self {
        WriteOperations {
            inner: Arc::new(WriteOperationsInner {
                id_field: id_field.to_string(),
                codec,
                index_manager,
                read_operations,
                default_ttl,
            }),
        }
    }

    pub fn set(
        &self,
        store: &StoreAdapter,
        document: &Document,
        ttl: Option<Duration>,
    ) -> KvDocResult<DocId> {
        self.inner.set(store, document, ttl)
    }

    pub fn update(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        patch: &Document,
        just_once: bool,
    ) -> KvDocResult<WriteResult> {
        self.inner.update(store, filter, patch, just_once)
    }

    pub fn delete(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        just_once: bool,
    ) -> KvDocResult<WriteResult> {
        self.inner.delete(store, filter, just_once)
    }

    pub fn reconcile(&self, store: &StoreAdapter) -> KvDocResult<WriteResult> {
        self.inner.reconcile(store)
    }

    pub fn clear(&self, store: &StoreAdapter) -> KvDocResult<WriteResult> {
        self.inner.clear(store)
    }
}

struct WriteOperationsInner {
    id_field: String,
    codec: DocumentCodec,
    index_manager: IndexManager,
    read_operations: ReadOperations,
    default_ttl: Option<Duration>,
}

impl WriteOperationsInner {
    fn set(
        &self,
        store: &StoreAdapter,
        document: &Document,
        ttl: Option<Duration>,
    ) -> KvDocResult<DocId> {
        validate_document(document)?;
        let id = self.codec.identifier(document, &self.id_field)?;
        let value = self.codec.encode(document)?;
        let expiry = Expiry::from(ttl.or(self.default_ttl));

        let prior = match self.read_operations.get_by_id(store, &id) {
            Ok(prior) => prior,
            Err(err) if err.kind() == &ErrorKind::CorruptRecord => {
                log::warn!("Overwriting unreadable document {}: {}", id, err);
                None
            }
            Err(err) => return Err(err),
        };

        let key = self.read_operations.doc_key(&id);
        match prior {
            Some(prior) => {
                let plan = self.index_manager.plan_reindex(Some(&prior), document);
                self.index_manager.apply_additions(store, &id, &plan)?;
                store.set_value(&key, value, expiry)?;
                self.reassert(store, &id, plan.additions())?;
                self.index_manager.apply_removals(store, &id, &plan)?;
            }
            None => {
                let keys = self.index_manager.entry_keys(document);
                self.index_manager.add_memberships(store, &id, &keys)?;
                store.set_value(&key, value, expiry)?;
                self.reassert(store, &id, &keys)?;
            }
        }

        log::debug!("Document {} stored", id);
        Ok(id)
    }

    fn update(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        patch: &Document,
        just_once: bool,
    ) -> KvDocResult<WriteResult> {
        self.validate_patch(patch)?;

        let limit = if just_once { Some(1) } else { None };
        let matches = self.read_operations.matching(store, filter, limit)?;

        let mut result = WriteResult::default();
        result.extend_failures(matches.failures);
        for (id, document) in matches.entries {
            match self.update_one(store, &id, document, patch) {
                Ok(true) => result.add_affected(id),
                Ok(false) => log::debug!("Document {} vanished before its update", id),
                Err(err) => {
                    log::warn!("Failed to update document {}: {}", id, err);
                    result.add_failure(ItemFailure::new(id, err));
                }
            }
        }

        log::debug!(
            "Updated {} documents, {} failures",
            result.affected_count(),
            result.failures().len()
        );
        Ok(result)
    }

    /// Applies `patch` to a matched document. Returns `false` when the record is
    /// gone by the time it would be written.
    fn update_one(
        &self,
        store: &StoreAdapter,
        id: &DocId,
        mut document: Document,
        patch: &Document,
    ) -> KvDocResult<bool> {
        let old = document.clone();
        document.merge(patch);
        let value = self.codec.encode(&document)?;
        let key = self.read_operations.doc_key(id);

        // an expired or deleted record must not come back without its TTL
        if store.get_value(&key)?.is_none() {
            return Ok(false);
        }

        let plan = self.index_manager.plan_reindex(Some(&old), &document);
        if plan.is_empty() {
            store.set_value(&key, value, Expiry::Keep)?;
            return Ok(true);
        }

        log::debug!(
            "Document {} gains {} and loses {} index memberships",
            id,
            plan.additions().len(),
            plan.removals().len()
        );
        self.index_manager.apply_additions(store, id, &plan)?;
        store.set_value(&key, value, Expiry::Keep)?;
        self.reassert(store, id, plan.additions())?;

        // the record is already updated, leftover memberships are masked on read
        if let Err(err) = self.index_manager.apply_removals(store, id, &plan) {
            log::warn!("Stale index entries left for document {}: {}", id, err);
        }
        Ok(true)
    }

    /// Adds the new memberships again once the record is stored. A read that fetched
    /// the previous content in between may have evicted them.
    fn reassert(&self, store: &StoreAdapter, id: &DocId, keys: &[String]) -> KvDocResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let added = self.index_manager.add_memberships(store, id, keys)?;
        if added > 0 {
            log::debug!("Re-added {} index memberships of {}", added, id);
        }
        Ok(())
    }

    fn delete(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        just_once: bool,
    ) -> KvDocResult<WriteResult> {
        let limit = if just_once { Some(1) } else { None };
        let matches = self.read_operations.matching(store, filter, limit)?;

        let mut result = WriteResult::default();
        result.extend_failures(matches.failures);
        for (id, document) in matches.entries {
            match store.delete_value(&self.read_operations.doc_key(&id)) {
                Ok(removed) => {
                    if let Err(err) = self.index_manager.unindex_document(store, &id, &document) {
                        log::warn!("Dangling index entries left for document {}: {}", id, err);
                    }
                    if removed {
                        result.add_affected(id);
                    }
                }
                Err(err) => {
                    log::warn!("Failed to delete document {}: {}", id, err);
                    result.add_failure(ItemFailure::new(id, err));
                }
            }
        }

        log::debug!(
            "Deleted {} documents, {} failures",
            result.affected_count(),
            result.failures().len()
        );
        Ok(result)
    }

    /// Rebuilds index memberships from stored documents.
    ///
    /// Members of every index entry are checked against the documents they point to
    /// and evicted when dangling or stale; entries of fields that are no longer
    /// indexed are emptied. Every readable document is then indexed again.
    fn reconcile(&self, store: &StoreAdapter) -> KvDocResult<WriteResult> {
        let mut result = WriteResult::default();
        let mut documents: HashMap<DocId, Option<Document>> = HashMap::new();

        for id in self.read_operations.all_ids(store)? {
            match self.read_operations.get_by_id(store, &id) {
                Ok(document) => {
                    documents.insert(id, document);
                }
                Err(err) if err.is_item_local() => {
                    log::warn!("Skipping document {} during reconcile: {}", id, err);
                    result.add_failure(ItemFailure::new(id, err));
                }
                Err(err) => return Err(err),
            }
        }

        let index_prefix = self.index_manager.index_prefix();
        let mut evicted = 0;
        for key in store.list_keys_with_prefix(&index_prefix)? {
            let Some((field, canonical)) = split_index_key(&index_prefix, &key) else {
                log::warn!("Ignoring malformed index key {}", key);
                continue;
            };
            let indexed = self.index_manager.is_indexed(&field);

            for member in store.set_members(&key)? {
                let id = DocId::from_canonical(member);
                let keep = match documents.get(&id) {
                    // unreadable, leave its memberships alone
                    None if result.failures().iter().any(|f| f.id() == &id) => true,
                    Some(Some(document)) => {
                        indexed
                            && document
                                .get(&field)
                                .is_some_and(|value| value.canonical() == canonical)
                    }
                    _ => false,
                };
                if !keep && store.remove_set_member(&key, id.as_str())? {
                    evicted += 1;
                }
            }
        }

        for (id, document) in documents {
            if let Some(document) = document {
                self.index_manager.index_document(store, &id, &document)?;
                result.add_affected(id);
            }
        }

        if evicted > 0 {
            log::warn!("Reconcile evicted {} index memberships", evicted);
        }
        log::debug!("Reconciled {} documents", result.affected_count());
        Ok(result)
    }

    /// Removes every document and index entry of the collection.
    fn clear(&self, store: &StoreAdapter) -> KvDocResult<WriteResult> {
        let mut result = WriteResult::default();
        for id in self.read_operations.all_ids(store)? {
            match store.delete_value(&self.read_operations.doc_key(&id)) {
                Ok(true) => result.add_affected(id),
                Ok(false) => {}
                Err(err) => {
                    log::warn!("Failed to delete document {}: {}", id, err);
                    result.add_failure(ItemFailure::new(id, err));
                }
            }
        }

        for key in store.list_keys_with_prefix(&self.index_manager.index_prefix())? {
            store.delete_value(&key)?;
        }

        log::debug!("Cleared {} documents", result.affected_count());
        Ok(result)
    }

    fn validate_patch(&self, patch: &Document) -> KvDocResult<()> {
        validate_document(patch)?;
        if patch.contains_key(&self.id_field) {
            log::error!("Update patch must not change the id field {}", self.id_field);
            return Err(KvDocError::new(
                &format!("Update patch must not change the id field {}", self.id_field),
                ErrorKind::InvalidDocument,
            ));
        }
        Ok(())
    }
}

fn validate_document(document: &Document) -> KvDocResult<()> {
    for (field, _) in document.iter() {
        validate_field_name(field)?;
    }
    Ok(())
}
