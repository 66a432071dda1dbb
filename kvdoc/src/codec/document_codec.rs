use crate::collection::{validate_field_name, DocId, Document};
use crate::common::{
    Value, RECORD_BOOL_TAG, RECORD_FLOAT_TAG, RECORD_INTEGER_TAG, RECORD_STRING_TAG,
};
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use crate::store::StoreValue;
use std::collections::BTreeMap;

/// How documents are laid out in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// The whole document serialized into one opaque value.
    #[default]
    Blob,
    /// One field-addressable record per document, every value as tagged text.
    Structured,
}

/// Encodes documents to store values and decodes them back.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentCodec {
    mode: StorageMode,
}

impl DocumentCodec {
    pub fn new(mode: StorageMode) -> Self {
        DocumentCodec { mode }
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn encode(&self, document: &Document) -> KvDocResult<StoreValue> {
        match self.mode {
            StorageMode::Blob => {
                let bytes = bincode::serde::encode_to_vec(document, bincode::config::legacy())?;
                Ok(StoreValue::Blob(bytes))
            }
            StorageMode::Structured => {
                let record = document
                    .iter()
                    .map(|(field, value)| (field.clone(), encode_field(value)))
                    .collect();
                Ok(StoreValue::Record(record))
            }
        }
    }

    /// Decodes a stored value. Values written in either mode are accepted.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::CorruptRecord` when the value cannot be decoded.
    pub fn decode(&self, value: &StoreValue) -> KvDocResult<Document> {
        match value {
            StoreValue::Blob(bytes) => decode_blob(bytes),
            StoreValue::Record(record) => decode_record(record),
        }
    }

    /// Reads the primary identifier of `document` from `id_field`.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidDocument` if the field is missing or holds
    /// something other than a string or an integer.
    pub fn identifier(&self, document: &Document, id_field: &str) -> KvDocResult<DocId> {
        match document.get(id_field) {
            Some(value) => DocId::from_value(value),
            None => {
                log::error!("Document {} has no id field {}", document, id_field);
                Err(KvDocError::new(
                    &format!("Document has no id field {}", id_field),
                    ErrorKind::InvalidDocument,
                ))
            }
        }
    }
}

fn decode_blob(bytes: &[u8]) -> KvDocResult<Document> {
    let (document, read): (Document, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::legacy())?;
    if read != bytes.len() {
        log::error!("Blob has {} trailing bytes", bytes.len() - read);
        return Err(KvDocError::new(
            &format!("Blob has {} trailing bytes", bytes.len() - read),
            ErrorKind::CorruptRecord,
        ));
    }

    for field in document.fields() {
        validate_stored_field(&field)?;
    }
    Ok(document)
}

fn decode_record(record: &BTreeMap<String, String>) -> KvDocResult<Document> {
    let mut document = Document::new();
    for (field, text) in record {
        validate_stored_field(field)?;
        document.put(field.as_str(), decode_field(field, text)?)?;
    }
    Ok(document)
}

fn validate_stored_field(field: &str) -> KvDocResult<()> {
    validate_field_name(field).map_err(|err| {
        KvDocError::new_with_cause(
            &format!("Stored document has an invalid field name {:?}", field),
            ErrorKind::CorruptRecord,
            err,
        )
    })
}

fn encode_field(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{}:{}", RECORD_STRING_TAG, s),
        Value::Integer(i) => format!("{}:{}", RECORD_INTEGER_TAG, i),
        Value::Float(f) => format!("{}:{}", RECORD_FLOAT_TAG, f),
        Value::Bool(b) => format!("{}:{}", RECORD_BOOL_TAG, b),
    }
}

fn decode_field(field: &str, text: &str) -> KvDocResult<Value> {
    let corrupt = || {
        log::error!("Field {} holds undecodable text {:?}", field, text);
        KvDocError::new(
            &format!("Field {} holds undecodable text {:?}", field, text),
            ErrorKind::CorruptRecord,
        )
    };

    let (tag, body) = text.split_once(':').ok_or_else(corrupt)?;
    match tag {
        RECORD_STRING_TAG => Ok(Value::String(body.to_string())),
        RECORD_INTEGER_TAG => body.parse::<i64>().map(Value::Integer).map_err(|_| corrupt()),
        RECORD_FLOAT_TAG => body.parse::<f64>().map(Value::Float).map_err(|_| corrupt()),
        RECORD_BOOL_TAG => body.parse::<bool>().map(Value::Bool).map_err(|_| corrupt()),
        _ => Err(corrupt()),
    }
}
