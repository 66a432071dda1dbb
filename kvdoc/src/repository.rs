use crate::collection::Collection;
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use crate::repository_builder::RepositoryBuilder;
use crate::repository_config::RepositoryConfig;
use crate::store::KvStore;
use std::sync::Arc;

/// Entry point of the document layer.
///
/// A repository binds a [RepositoryConfig] to a key-value store and hands out
/// [Collection] handles. It holds no other state: every document and index entry
/// lives in the store, so any number of repositories built over the same store and
/// configuration observe the same data.
///
/// ```rust,ignore
/// let repository = Repository::builder()
///     .store(KvStore::new(InMemoryStore::new()))
///     .indexed_fields(&["role"])
///     .build()?;
///
/// let users = repository.collection("users", "userId")?;
/// users.set(&doc!{ userId: 1, role: "CTO", age: 30 })?;
/// let ctos = users.find(filter!{ role: "CTO" })?;
/// ```
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

impl Repository {
    pub fn builder() -> RepositoryBuilder {
        RepositoryBuilder::new()
    }

    pub(crate) fn new(config: RepositoryConfig, store: KvStore) -> Self {
        Repository {
            inner: Arc::new(RepositoryInner { config, store }),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &KvStore {
        &self.inner.store
    }

    /// Returns a handle to the collection `name` whose documents are identified by
    /// `id_field`.
    ///
    /// Handles are cheap; collections with different names never share keys.
    pub fn collection(&self, name: &str, id_field: &str) -> KvDocResult<Collection> {
        if name.is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(KvDocError::new(
                "Collection name cannot be empty",
                ErrorKind::InvalidConfiguration,
            ));
        }

        if id_field.is_empty() {
            log::error!("Id field of collection {} cannot be empty", name);
            return Err(KvDocError::new(
                &format!("Id field of collection {} cannot be empty", name),
                ErrorKind::InvalidConfiguration,
            ));
        }

        Ok(Collection::new(
            name,
            id_field,
            &self.inner.config,
            self.inner.store.clone(),
        ))
    }
}

struct RepositoryInner {
    config: RepositoryConfig,
    store: KvStore,
}
