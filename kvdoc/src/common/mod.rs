//! Common types shared by every layer: values, key derivation, sort order and
//! small concurrency helpers.

mod constants;
mod sort_order;
mod value;
pub(crate) mod util;

pub use constants::*;
pub use sort_order::*;
pub use value::*;
pub use util::*;
