use crate::common::{Value, NUMBER_TAG, STRING_TAG};
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use std::fmt::Display;

/// Canonical text form of a document identifier.
///
/// Identifiers are assigned by the caller and are either strings or integers. The
/// canonical form carries the type tag (`s:alice`, `n:3`) so that the string `"3"`
/// and the integer `3` never collide. It is the member stored in index sets and the
/// last component of the primary record key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(String);

impl DocId {
    /// Builds the identifier of a document from its id field value.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidDocument` when the value is neither a string nor an
    /// integer.
    pub fn from_value(value: &Value) -> KvDocResult<DocId> {
        match value {
            Value::String(_) | Value::Integer(_) => Ok(DocId(value.canonical())),
            _ => {
                log::error!("Document id must be a string or an integer, found {}", value);
                Err(KvDocError::new(
                    &format!("Document id must be a string or an integer, found {}", value),
                    ErrorKind::InvalidDocument,
                ))
            }
        }
    }

    /// Wraps an already canonical identifier as read back from the store.
    pub(crate) fn from_canonical(canonical: String) -> DocId {
        DocId(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts the identifier back to the value it was built from.
    ///
    /// Returns `None` for text that is not a canonical identifier.
    pub fn to_value(&self) -> Option<Value> {
        let (tag, text) = self.0.split_once(':')?;
        match tag {
            STRING_TAG => Some(Value::String(text.to_string())),
            NUMBER_TAG => text.parse::<i64>().ok().map(Value::Integer),
            _ => None,
        }
    }
}

impl Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&Value> for DocId {
    type Error = KvDocError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        DocId::from_value(value)
    }
}
