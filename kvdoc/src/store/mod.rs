//! Key-value store abstraction.
//!
//! The document layer never talks to a backend directly. Everything goes through the
//! [KvStoreProvider] primitive set, which mirrors what a Redis-like store offers:
//!
//! - plain values: get, set (with expiry), delete, expire
//! - sets of strings: add member, remove member, members, intersection, union
//! - prefix listing of keys (only used by scan fallback and maintenance)
//!
//! A [KvStore] is the cloneable handle over a provider. Each logical operation wraps
//! it into a [StoreAdapter] carrying the caller's [Deadline], which is checked before
//! every primitive call.
//!
//! # Backends
//! - **In-Memory Store**: [memory::InMemoryStore], Redis-like semantics in process

mod deadline;
mod kv_store;
pub mod memory;
mod store_adapter;
mod store_value;

pub use deadline::*;
pub use kv_store::*;
pub use store_adapter::*;
pub use store_value::*;
