use crate::collection::Document;
use crate::common::SortOrder;
use std::cmp::Ordering;

/// Options controlling the shape of a find result: ordering, skip and limit.
///
/// Without `sort_by` documents come back in candidate order (index or key order).
/// When sorting, documents missing a sort field come last regardless of the
/// direction, and values of different kinds order as `Bool < Number < String`.
///
/// # Examples
///
/// ```rust,ignore
/// let options = order_by("age", SortOrder::Descending).skip(10).limit(5);
/// let page = collection.find_with_options(filter!{ role: "CTO" }, &options)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub(crate) sort_by: Vec<(String, SortOrder)>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
}

pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

pub fn skip_by(skip: u64) -> FindOptions {
    FindOptions::new().skip(skip)
}

pub fn limit_to(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions {
            sort_by: Vec::new(),
            skip: None,
            limit: None,
        }
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Adds a sort key; earlier keys take precedence.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        self.sort_by.push((field_name.to_string(), sort_order));
        self
    }

    pub fn has_sort(&self) -> bool {
        !self.sort_by.is_empty()
    }

    pub(crate) fn compare(&self, left: &Document, right: &Document) -> Ordering {
        for (field, order) in &self.sort_by {
            let ordering = match (left.get(field), right.get(field)) {
                (Some(l), Some(r)) => match order {
                    SortOrder::Ascending => l.sort_cmp(r),
                    SortOrder::Descending => r.sort_cmp(l),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sorts (stably), skips and truncates `documents` in place.
    pub(crate) fn apply(&self, documents: &mut Vec<Document>) {
        if self.has_sort() {
            documents.sort_by(|left, right| self.compare(left, right));
        }

        let skip = self.skip.unwrap_or(0).min(documents.len() as u64) as usize;
        documents.drain(..skip);

        if let Some(limit) = self.limit {
            documents.truncate(limit.min(documents.len() as u64) as usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn ages(documents: &[Document]) -> Vec<String> {
        documents
            .iter()
            .map(|doc| match doc.get("age") {
                Some(value) => value.to_string(),
                None => "-".to_string(),
            })
            .collect()
    }

    fn sample() -> Vec<Document> {
        vec![
            doc! { id: 1, age: 30 },
            doc! { id: 2 },
            doc! { id: 3, age: 25.5 },
            doc! { id: 4, age: 40 },
        ]
    }

    #[test]
    fn test_order_by_ascending_missing_last() {
        let mut docs = sample();
        order_by("age", SortOrder::Ascending).apply(&mut docs);
        assert_eq!(ages(&docs), vec!["25.5", "30", "40", "-"]);
    }

    #[test]
    fn test_order_by_descending_missing_last() {
        let mut docs = sample();
        order_by("age", SortOrder::Descending).apply(&mut docs);
        assert_eq!(ages(&docs), vec!["40", "30", "25.5", "-"]);
    }

    #[test]
    fn test_skip_and_limit() {
        let mut docs = sample();
        order_by("age", SortOrder::Ascending)
            .skip(1)
            .limit(2)
            .apply(&mut docs);
        assert_eq!(ages(&docs), vec!["30", "40"]);

        let mut docs = sample();
        skip_by(10).apply(&mut docs);
        assert!(docs.is_empty());

        let mut docs = sample();
        limit_to(0).apply(&mut docs);
        assert!(docs.is_empty());
    }

    #[test]
    fn test_without_sort_keeps_order() {
        let mut docs = sample();
        limit_to(2).apply(&mut docs);
        assert_eq!(ages(&docs), vec!["30", "-"]);
    }

    #[test]
    fn test_secondary_sort_key() {
        let mut docs = vec![
            doc! { role: "CTO", age: 30 },
            doc! { role: "CEO", age: 40 },
            doc! { role: "CTO", age: 25 },
        ];
        FindOptions::new()
            .sort_by("role", SortOrder::Ascending)
            .sort_by("age", SortOrder::Descending)
            .apply(&mut docs);
        assert_eq!(ages(&docs), vec!["40", "30", "25"]);
    }

    #[test]
    fn test_mixed_kinds() {
        let mut docs = vec![
            doc! { v: "text" },
            doc! { v: 3 },
            doc! { v: false },
        ];
        order_by("v", SortOrder::Ascending).apply(&mut docs);
        assert_eq!(docs[0].get("v").and_then(|v| v.as_bool()), Some(false));
        assert_eq!(docs[2].get("v").and_then(|v| v.as_str()), Some("text"));
    }
}
