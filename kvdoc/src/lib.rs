//! # kvdoc
//!
//! A document query layer on top of a key-value store.
//!
//! Documents are flat maps of scalar values stored under their id. For each configured
//! indexed field the layer maintains one set of ids per distinct value, and answers
//! Mongo-like filters by intersecting those sets, falling back to a scan of the
//! collection when no index applies.
//!
//! ```rust,ignore
//! use kvdoc::repository::Repository;
//! use kvdoc::store::{memory::InMemoryStore, KvStore};
//! use kvdoc::{doc, filter};
//!
//! let repository = Repository::builder()
//!     .store(KvStore::new(InMemoryStore::new()))
//!     .indexed_fields(&["role", "age"])
//!     .build()?;
//!
//! let users = repository.collection("users", "userId")?;
//! users.set(&doc!{ userId: 1, role: "CTO", age: 30 })?;
//! users.set(&doc!{ userId: 2, role: "CEO", age: 40 })?;
//!
//! // index intersection on role and age
//! let found = users.find(filter!{ role: "CTO", age: 30 })?;
//! assert_eq!(found.size(), 1);
//! ```
//!
//! ## Modules
//!
//! - [store]: the key-value primitive set, deadlines and the in-memory backend
//! - [codec]: document encoding in blob or structured mode
//! - [filter]: filter specs and their compilation into predicates
//! - [collection]: documents, collections, planning and execution
//! - [repository]: configuration and collection handles

use crate::common::*;

pub mod codec;
pub mod collection;
pub mod common;
pub mod errors;
pub mod filter;
pub mod repository;
pub mod repository_builder;
pub mod repository_config;
pub mod store;

#[cfg(test)]
#[ctor::ctor]
fn init() {
    colog::init();
}
