use crate::codec::DocumentCodec;
use crate::collection::operation::{
    FindOptimizer, IndexManager, ReadOperations, WriteOperations, WriteResult,
};
use crate::collection::{DocId, Document, DocumentCursor, FindOptions, FindPlan};
use crate::errors::KvDocResult;
use crate::filter::Filter;
use crate::repository_config::RepositoryConfig;
use crate::store::StoreAdapter;
use std::collections::BTreeSet;
use std::time::Duration;

/// Wires the read and write paths of one collection from the repository
/// configuration.
#[derive(Clone)]
pub(crate) struct CollectionOperations {
    index_manager: IndexManager,
    read_operations: ReadOperations,
    write_operations: WriteOperations,
}

impl CollectionOperations {
    pub fn new(collection_name: &str, id_field: &str, config: &RepositoryConfig) -> Self {
        let codec = DocumentCodec::new(config.storage_mode());
        let index_manager = IndexManager::new(
            config.key_prefix(),
            collection_name,
            config.indexed_fields().clone(),
        );
        let find_optimizer = FindOptimizer::new(id_field, index_manager.clone());

        let read_operations = ReadOperations::new(
            config.key_prefix(),
            collection_name,
            codec,
            index_manager.clone(),
            find_optimizer,
            config.read_repair(),
        );

        let write_operations = WriteOperations::new(
            id_field,
            codec,
            index_manager.clone(),
            read_operations.clone(),
            config.default_ttl(),
        );

        CollectionOperations {
            index_manager,
            read_operations,
            write_operations,
        }
    }

    pub fn set(
        &self,
        store: &StoreAdapter,
        document: &Document,
        ttl: Option<Duration>,
    ) -> KvDocResult<DocId> {
        self.write_operations.set(store, document, ttl)
    }

    pub fn find(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        find_options: &FindOptions,
    ) -> KvDocResult<DocumentCursor> {
        self.read_operations.find(store, filter, find_options)
    }

    pub fn explain(&self, filter: Filter, find_options: &FindOptions) -> FindPlan {
        self.read_operations.explain(filter, find_options)
    }

    pub fn get_by_id(&self, store: &StoreAdapter, id: &DocId) -> KvDocResult<Option<Document>> {
        self.read_operations.get_by_id(store, id)
    }

    pub fn update(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        patch: &Document,
        just_once: bool,
    ) -> KvDocResult<WriteResult> {
        self.write_operations.update(store, filter, patch, just_once)
    }

    pub fn delete(
        &self,
        store: &StoreAdapter,
        filter: Filter,
        just_once: bool,
    ) -> KvDocResult<WriteResult> {
        self.write_operations.delete(store, filter, just_once)
    }

    pub fn reconcile(&self, store: &StoreAdapter) -> KvDocResult<WriteResult> {
        self.write_operations.reconcile(store)
    }

    pub fn index_entries(
        &self,
        store: &StoreAdapter,
        field: &str,
    ) -> KvDocResult<Vec<(String, BTreeSet<DocId>)>> {
        self.index_manager.entries(store, field)
    }

    pub fn clear(&self, store: &StoreAdapter) -> KvDocResult<WriteResult> {
        self.write_operations.clear(store)
    }
}
