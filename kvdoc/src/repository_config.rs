//! Configuration of a repository.

use crate::codec::StorageMode;
use crate::common::OPERATOR_PREFIX;
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use std::collections::BTreeSet;
use std::time::Duration;

/// Settings shared by every collection of a [Repository](crate::repository::Repository).
///
/// A configuration is assembled by the
/// [RepositoryBuilder](crate::repository_builder::RepositoryBuilder) and frozen when
/// the repository is built; only read access is public.
///
/// | Setting | Default |
/// |---------|---------|
/// | storage mode | [StorageMode::Blob] |
/// | default TTL | none, documents never expire |
/// | indexed fields | none, every query scans |
/// | key prefix | empty |
/// | operation timeout | none |
/// | read repair | enabled |
#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    storage_mode: StorageMode,
    default_ttl: Option<Duration>,
    indexed_fields: BTreeSet<String>,
    key_prefix: String,
    operation_timeout: Option<Duration>,
    read_repair: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        RepositoryConfig {
            storage_mode: StorageMode::Blob,
            default_ttl: None,
            indexed_fields: BTreeSet::new(),
            key_prefix: String::new(),
            operation_timeout: None,
            read_repair: true,
        }
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    pub fn indexed_fields(&self) -> &BTreeSet<String> {
        &self.indexed_fields
    }

    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexed_fields.contains(field)
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }

    pub fn read_repair(&self) -> bool {
        self.read_repair
    }

    pub(crate) fn set_storage_mode(&mut self, storage_mode: StorageMode) {
        self.storage_mode = storage_mode;
    }

    pub(crate) fn set_default_ttl(&mut self, ttl: Duration) -> KvDocResult<()> {
        if ttl.is_zero() {
            log::error!("Default TTL must be greater than zero");
            return Err(KvDocError::new(
                "Default TTL must be greater than zero",
                ErrorKind::InvalidConfiguration,
            ));
        }
        self.default_ttl = Some(ttl);
        Ok(())
    }

    pub(crate) fn add_indexed_field(&mut self, field: &str) -> KvDocResult<()> {
        if field.is_empty() {
            log::error!("Indexed field name cannot be empty");
            return Err(KvDocError::new(
                "Indexed field name cannot be empty",
                ErrorKind::InvalidConfiguration,
            ));
        }

        if field.starts_with(OPERATOR_PREFIX) {
            log::error!("Indexed field name {} is reserved for operators", field);
            return Err(KvDocError::new(
                &format!("Indexed field name {} is reserved for operators", field),
                ErrorKind::InvalidConfiguration,
            ));
        }

        self.indexed_fields.insert(field.to_string());
        Ok(())
    }

    pub(crate) fn set_key_prefix(&mut self, key_prefix: &str) {
        self.key_prefix = key_prefix.to_string();
    }

    pub(crate) fn set_operation_timeout(&mut self, timeout: Duration) -> KvDocResult<()> {
        if timeout.is_zero() {
            log::error!("Operation timeout must be greater than zero");
            return Err(KvDocError::new(
                "Operation timeout must be greater than zero",
                ErrorKind::InvalidConfiguration,
            ));
        }
        self.operation_timeout = Some(timeout);
        Ok(())
    }

    pub(crate) fn set_read_repair(&mut self, enabled: bool) {
        self.read_repair = enabled;
    }
}
