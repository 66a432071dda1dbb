mod key_utils;
mod type_utils;

pub(crate) use key_utils::*;
pub use type_utils::*;
