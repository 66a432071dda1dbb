use crate::common::{DOC_SEGMENT, ESCAPE_CHAR, INDEX_SEGMENT, KEY_SEPARATOR};

/// Escapes a key component so that it never contains a bare separator.
pub(crate) fn escape_component(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    for c in component.chars() {
        if c == ESCAPE_CHAR || c == KEY_SEPARATOR {
            escaped.push(ESCAPE_CHAR);
        }
        escaped.push(c);
    }
    escaped
}

/// Reverses [escape_component]. Returns `None` on a dangling escape or a bare separator.
pub(crate) fn unescape_component(component: &str) -> Option<String> {
    let mut unescaped = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR {
            unescaped.push(chars.next()?);
        } else if c == KEY_SEPARATOR {
            return None;
        } else {
            unescaped.push(c);
        }
    }
    Some(unescaped)
}

/// `<prefix><collection>:doc:`
pub(crate) fn doc_prefix(key_prefix: &str, collection: &str) -> String {
    format!(
        "{}{}{}{}{}",
        key_prefix,
        escape_component(collection),
        KEY_SEPARATOR,
        DOC_SEGMENT,
        KEY_SEPARATOR
    )
}

/// `<prefix><collection>:doc:<id>`
pub(crate) fn doc_key(key_prefix: &str, collection: &str, canonical_id: &str) -> String {
    let mut key = doc_prefix(key_prefix, collection);
    key.push_str(&escape_component(canonical_id));
    key
}

/// `<prefix><collection>:idx:`, the prefix shared by every index entry of a collection.
pub(crate) fn index_prefix(key_prefix: &str, collection: &str) -> String {
    format!(
        "{}{}{}{}{}",
        key_prefix,
        escape_component(collection),
        KEY_SEPARATOR,
        INDEX_SEGMENT,
        KEY_SEPARATOR
    )
}

/// `<prefix><collection>:idx:<field>:`
pub(crate) fn field_index_prefix(key_prefix: &str, collection: &str, field: &str) -> String {
    let mut key = index_prefix(key_prefix, collection);
    key.push_str(&escape_component(field));
    key.push(KEY_SEPARATOR);
    key
}

/// `<prefix><collection>:idx:<field>:<value>`
pub(crate) fn index_key(
    key_prefix: &str,
    collection: &str,
    field: &str,
    canonical_value: &str,
) -> String {
    let mut key = field_index_prefix(key_prefix, collection, field);
    key.push_str(&escape_component(canonical_value));
    key
}

/// Extracts the canonical id from a primary record key listed under `prefix`.
pub(crate) fn doc_id_from_key(prefix: &str, key: &str) -> Option<String> {
    key.strip_prefix(prefix).and_then(unescape_component)
}

/// Splits an index key listed under a collection's index prefix into
/// `(field, canonical value)`.
pub(crate) fn split_index_key(prefix: &str, key: &str) -> Option<(String, String)> {
    let rest = key.strip_prefix(prefix)?;
    let mut escaped = false;
    for (position, c) in rest.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE_CHAR {
            escaped = true;
        } else if c == KEY_SEPARATOR {
            let field = unescape_component(&rest[..position])?;
            let value = unescape_component(&rest[position + 1..])?;
            return Some((field, value));
        }
    }
    None
}
