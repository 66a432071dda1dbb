use crate::collection::operation::ItemFailure;
use crate::collection::{Document, FindPlan};

/// Result of a find operation.
///
/// The cursor is a materialized snapshot: matching documents were fetched and
/// re-validated when the query ran. Documents that could not be read (corrupt
/// record, per-document timeout) are not in the result; they are listed in
/// [DocumentCursor::failures] instead. Iteration is one-shot.
pub struct DocumentCursor {
    documents: Vec<Document>,
    failures: Vec<ItemFailure>,
    current_index: usize,
    find_plan: FindPlan,
}

impl DocumentCursor {
    pub(crate) fn new(
        documents: Vec<Document>,
        failures: Vec<ItemFailure>,
        find_plan: FindPlan,
    ) -> Self {
        DocumentCursor {
            documents,
            failures,
            current_index: 0,
            find_plan,
        }
    }

    /// Total number of documents in the result.
    pub fn size(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn first(&self) -> Option<&Document> {
        self.documents.first()
    }

    /// Documents skipped because they could not be read.
    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn find_plan(&self) -> &FindPlan {
        &self.find_plan
    }

    /// Consumes the cursor, returning the documents and the failures.
    pub fn into_parts(self) -> (Vec<Document>, Vec<ItemFailure>) {
        (self.documents, self.failures)
    }
}

impl Iterator for DocumentCursor {
    type Item = Document;

    fn next(&mut self) -> Option<Self::Item> {
        let document = self.documents.get(self.current_index).cloned();
        if document.is_some() {
            self.current_index += 1;
        }
        document
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.documents.len().saturating_sub(self.current_index);
        (remaining, Some(remaining))
    }
}
