//! Collections and documents.
//!
//! A [Document] is a flat map from field names to scalar [Value](crate::common::Value)s.
//! A [Collection] stores documents under the value of a declared id field and keeps one
//! index entry per `(indexed field, value)` pair, a set of the ids having that value.
//!
//! ```rust,ignore
//! use kvdoc::{doc, filter};
//!
//! let users = repository.collection("users", "userId")?;
//! users.set(&doc!{ userId: 1, role: "CTO", age: 30 })?;
//! users.set(&doc!{ userId: 2, role: "CEO", age: 40 })?;
//!
//! let ctos = users.find(filter!{ role: "CTO" })?;
//! let result = users.update(filter!{ userId: 2 }, &doc!{ age: 41 })?;
//! assert_eq!(result.affected_count(), 1);
//! ```
//!
//! # Query execution
//!
//! A filter is planned into a [FindPlan]:
//! - equality or membership on the id field reads the named documents directly
//! - equality or membership on indexed fields intersects their index entries
//! - anything else scans the collection
//!
//! Candidates are always read back and checked against the full filter.

mod doc_id;
mod document;
mod document_collection;
mod document_cursor;
mod find_options;
mod find_plan;
pub(crate) mod operation;
mod update_options;

pub use doc_id::*;
pub use document::*;
pub use document_collection::*;
pub use document_cursor::*;
pub use find_options::*;
pub use find_plan::*;
pub use operation::{ItemFailure, WriteResult};
pub use update_options::*;
