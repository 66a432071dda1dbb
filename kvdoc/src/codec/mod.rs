//! Document encoding.
//!
//! A [DocumentCodec] turns a [Document](crate::collection::Document) into the
//! [StoreValue](crate::store::StoreValue) written under its primary key and back. The
//! [StorageMode] decides the shape of the stored value; index semantics are the same
//! in both modes.

mod document_codec;

pub use document_codec::*;
