use crate::codec::StorageMode;
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use crate::repository::Repository;
use crate::repository_config::RepositoryConfig;
use crate::store::KvStore;
use std::time::Duration;

/// Builder of a [Repository].
///
/// Settings are validated as they are given; the first invalid one is remembered and
/// returned by [RepositoryBuilder::build].
///
/// ```rust,ignore
/// let repository = Repository::builder()
///     .store(KvStore::new(InMemoryStore::new()))
///     .indexed_fields(&["role", "age"])
///     .default_ttl(Duration::from_secs(3600))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RepositoryBuilder {
    error: Option<KvDocError>,
    config: RepositoryConfig,
    store: Option<KvStore>,
}

impl RepositoryBuilder {
    pub fn new() -> Self {
        RepositoryBuilder {
            error: None,
            config: RepositoryConfig::new(),
            store: None,
        }
    }

    pub fn store(mut self, store: KvStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn storage_mode(mut self, storage_mode: StorageMode) -> Self {
        self.config.set_storage_mode(storage_mode);
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_default_ttl(ttl) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn indexed_field(mut self, field: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.add_indexed_field(field) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn indexed_fields(self, fields: &[&str]) -> Self {
        fields
            .iter()
            .fold(self, |builder, field| builder.indexed_field(field))
    }

    pub fn key_prefix(mut self, key_prefix: &str) -> Self {
        self.config.set_key_prefix(key_prefix);
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_operation_timeout(timeout) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn read_repair(mut self, enabled: bool) -> Self {
        self.config.set_read_repair(enabled);
        self
    }

    pub fn build(self) -> KvDocResult<Repository> {
        if let Some(error) = self.error {
            return Err(error);
        }

        match self.store {
            Some(store) => {
                log::debug!("Repository configured with {:?}", self.config);
                Ok(Repository::new(self.config, store))
            }
            None => {
                log::error!("Repository requires a key-value store");
                Err(KvDocError::new(
                    "Repository requires a key-value store",
                    ErrorKind::InvalidConfiguration,
                ))
            }
        }
    }
}
