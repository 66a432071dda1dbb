mod collection_operations;
mod find_optimizer;
mod index_manager;
mod read_operations;
mod write_operations;
mod write_result;

pub(crate) use collection_operations::*;
pub(crate) use find_optimizer::*;
pub(crate) use index_manager::*;
pub(crate) use read_operations::*;
pub(crate) use write_operations::*;
pub use write_result::*;
