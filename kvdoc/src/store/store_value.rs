use std::collections::BTreeMap;
use std::time::Duration;

/// A value as held by the key-value store.
///
/// # Variants
/// - `Blob`: opaque bytes, a whole document serialized in one piece
/// - `Record`: a field-addressable record of text fields (a Redis hash)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreValue {
    Blob(Vec<u8>),
    Record(BTreeMap<String, String>),
}

impl StoreValue {
    pub fn is_blob(&self) -> bool {
        matches!(self, StoreValue::Blob(_))
    }

    pub fn is_record(&self) -> bool {
        matches!(self, StoreValue::Record(_))
    }
}

/// Expiry policy applied when a value is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Expiry {
    /// The value lives until it is deleted.
    #[default]
    Never,
    /// The value expires after the given duration.
    After(Duration),
    /// The value keeps whatever time to live it currently has.
    Keep,
}

impl From<Option<Duration>> for Expiry {
    fn from(ttl: Option<Duration>) -> Self {
        match ttl {
            Some(ttl) => Expiry::After(ttl),
            None => Expiry::Never,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_value_shape() {
        assert!(StoreValue::Blob(vec![1, 2]).is_blob());
        assert!(StoreValue::Record(BTreeMap::new()).is_record());
        assert!(!StoreValue::Record(BTreeMap::new()).is_blob());
    }

    #[test]
    fn test_expiry_from_option() {
        assert_eq!(Expiry::from(None), Expiry::Never);
        assert_eq!(
            Expiry::from(Some(Duration::from_secs(2))),
            Expiry::After(Duration::from_secs(2))
        );
        assert_eq!(Expiry::default(), Expiry::Never);
    }
}
