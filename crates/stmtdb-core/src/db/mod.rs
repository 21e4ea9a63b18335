//! Statement compilation, execution adapters, the queued pipeline, and the
//! storage front that ties them together.

pub mod executor;
pub mod pipeline;
pub mod statement;

mod storage;

// re-exports
pub use storage::{Storage, StorageError};
