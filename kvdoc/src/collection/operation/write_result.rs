use crate::collection::DocId;
use crate::errors::{ErrorKind, KvDocError};

/// A document an operation could not process, with the reason.
#[derive(Clone, Debug)]
pub struct ItemFailure {
    id: DocId,
    error: KvDocError,
}

impl ItemFailure {
    pub fn new(id: DocId, error: KvDocError) -> Self {
        Self { id, error }
    }

    pub fn id(&self) -> &DocId {
        &self.id
    }

    pub fn error(&self) -> &KvDocError {
        &self.error
    }

    pub fn kind(&self) -> &ErrorKind {
        self.error.kind()
    }
}

/// Outcome of a multi-document write.
///
/// Each matched document is processed independently; the ones that went through are
/// listed in [WriteResult::affected_ids], the others in [WriteResult::failures].
/// A partial failure is never returned as an error.
#[derive(Clone, Debug, Default)]
pub struct WriteResult {
    affected_ids: Vec<DocId>,
    failures: Vec<ItemFailure>,
}

impl WriteResult {
    pub fn new(affected_ids: Vec<DocId>, failures: Vec<ItemFailure>) -> Self {
        Self {
            affected_ids,
            failures,
        }
    }

    pub fn affected_ids(&self) -> &[DocId] {
        &self.affected_ids
    }

    pub fn affected_count(&self) -> usize {
        self.affected_ids.len()
    }

    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub(crate) fn add_affected(&mut self, id: DocId) {
        self.affected_ids.push(id);
    }

    pub(crate) fn add_failure(&mut self, failure: ItemFailure) {
        self.failures.push(failure);
    }

    pub(crate) fn extend_failures(&mut self, failures: impl IntoIterator<Item = ItemFailure>) {
        self.failures.extend(failures);
    }
}

impl IntoIterator for WriteResult {
    type Item = DocId;
    type IntoIter = std::vec::IntoIter<DocId>;

    fn into_iter(self) -> Self::IntoIter {
        self.affected_ids.into_iter()
    }
}
