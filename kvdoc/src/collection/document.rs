use crate::common::{Value, OPERATOR_PREFIX};
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use im::OrdMap;
use itertools::Itertools;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt::{Debug, Display};

type FieldVec = SmallVec<[String; 8]>;

/// Represents a document stored in a collection.
///
/// A document is a flat mapping from field name to scalar [Value]. One of its
/// fields is the collection's identifier field; which one is declared per
/// collection, the document itself does not know.
///
/// Field names must be non-empty and must not start with `$`, which is reserved for
/// filter operators.
///
/// ## Lock-Free Design
///
/// This struct uses `im::OrdMap` (a persistent ordered map):
/// - O(1) cloning via internal Arc sharing
/// - Mutations create new maps via structural sharing
/// - Fields iterate in name order, which keeps encoding deterministic
#[derive(Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Associates the specified [Value] with the specified field in this document.
    ///
    /// If the field already exists, its value is replaced.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidDocument` if the field name is empty or starts
    /// with `$`.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("name", "Alice")?;
    /// doc.put("age", 30)?;
    /// assert_eq!(doc.size(), 2);
    /// ```
    pub fn put<'a, T: Into<Value>>(
        &mut self,
        key: impl Into<Cow<'a, str>>,
        value: T,
    ) -> KvDocResult<()> {
        let key = key.into();
        validate_field_name(&key)?;
        self.data = self.data.update(key.into_owned(), value.into());
        Ok(())
    }

    /// Returns the value of `key`, or `None` if the document has no such field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Removes a field. Removing a missing field is a no-op.
    pub fn remove(&mut self, key: &str) {
        self.data = self.data.without(key);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the field names in order.
    pub fn fields(&self) -> FieldVec {
        self.data.keys().cloned().collect()
    }

    /// Iterates over `(field, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Shallow merge: every field of `other` overwrites the same field here.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            self.data = self.data.update(key.clone(), value.clone());
        }
    }
}

/// Checks that `name` can be used as a document field.
pub(crate) fn validate_field_name(name: &str) -> KvDocResult<()> {
    if name.is_empty() {
        log::error!("Document does not support empty field names");
        return Err(KvDocError::new(
            "Document does not support empty field names",
            ErrorKind::InvalidDocument,
        ));
    }

    if name.starts_with(OPERATOR_PREFIX) {
        log::error!("Field name {} is reserved for operators", name);
        return Err(KvDocError::new(
            &format!("Field name {} is reserved for operators", name),
            ErrorKind::InvalidDocument,
        ));
    }
    Ok(())
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Document{{{}}}",
            self.data
                .iter()
                .map(|(k, v)| format!("{}: {:?}", k, v))
                .join(", ")
        )
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.data
                .iter()
                .map(|(k, v)| format!("\"{}\": {}", k, v))
                .join(", ")
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Document {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// # Examples
///
/// ```rust
/// use kvdoc::doc;
///
/// let empty = doc!{};
///
/// let user = doc!{
///     userId: 1,
///     "role": "CTO",
///     age: 30,
///     balance: -12.5,
/// };
/// assert_eq!(user.size(), 4);
/// ```
///
/// # Panics
///
/// Panics if a field name is invalid (empty or starting with `$`).
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };

    ($($key:tt : $value:expr),* $(,)?) => {
        {
            let mut doc = $crate::collection::Document::new();
            $(
                doc.put($crate::collection::normalize(stringify!($key)), $crate::common::Value::from($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_put_and_get() {
        let mut doc = Document::new();
        doc.put("name", "Alice").unwrap();
        doc.put("age", 30).unwrap();
        assert_eq!(doc.get("name"), Some(&Value::from("Alice")));
        assert_eq!(doc.get("age"), Some(&Value::Integer(30)));
        assert_eq!(doc.get("missing"), None);
        assert_eq!(doc.size(), 2);
    }

    #[test]
    fn test_put_rejects_invalid_names() {
        let mut doc = Document::new();
        let err = doc.put("", 1).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidDocument);
        let err = doc.put("$gt", 1).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidDocument);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_put_replaces_value() {
        let mut doc = doc! { status: "inactive" };
        doc.put("status", "active").unwrap();
        assert_eq!(doc.get("status"), Some(&Value::from("active")));
        assert_eq!(doc.size(), 1);
    }

    #[test]
    fn test_remove() {
        let mut doc = doc! { a: 1, b: 2 };
        doc.remove("a");
        doc.remove("missing");
        assert!(!doc.contains_key("a"));
        assert!(doc.contains_key("b"));
    }

    #[test]
    fn test_merge_is_shallow_overwrite() {
        let mut doc = doc! { userId: 3, role: "CTO", age: 25 };
        doc.merge(&doc! { role: "Lead Dev", team: "core" });
        assert_eq!(doc.get("role"), Some(&Value::from("Lead Dev")));
        assert_eq!(doc.get("age"), Some(&Value::Integer(25)));
        assert_eq!(doc.get("team"), Some(&Value::from("core")));
        assert_eq!(doc.size(), 4);
    }

    #[test]
    fn test_fields_are_ordered() {
        let doc = doc! { b: 1, a: 2, c: 3 };
        assert_eq!(doc.fields().as_slice(), &["a", "b", "c"]);
    }

    #[test]
    fn test_doc_macro_forms() {
        let empty = doc! {};
        assert!(empty.is_empty());

        let negative = -4;
        let doc = doc! {
            "quoted": "yes",
            bare: true,
            expr: negative * 2,
            float: -1.5,
        };
        assert_eq!(doc.get("quoted"), Some(&Value::from("yes")));
        assert_eq!(doc.get("bare"), Some(&Value::Bool(true)));
        assert_eq!(doc.get("expr"), Some(&Value::Integer(-8)));
        assert_eq!(doc.get("float"), Some(&Value::Float(-1.5)));
    }

    #[test]
    fn test_equality_is_numeric_aware() {
        assert_eq!(doc! { age: 30 }, doc! { age: 30.0 });
        assert_ne!(doc! { age: 30 }, doc! { age: "30" });
    }

    #[test]
    fn test_from_iterator() {
        let doc: Document = vec![("a", Value::from(1)), ("b", Value::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(doc, doc! { a: 1, b: "x" });
    }

    #[test]
    fn test_display() {
        let doc = doc! { name: "Alice", age: 30 };
        assert_eq!(doc.to_string(), "{\"age\": 30, \"name\": \"Alice\"}");
    }
}
