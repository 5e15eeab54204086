//! Ports (trait seams) between the cache core and its collaborators.

pub mod bookkeeping_store;
pub mod dispatcher;
pub mod result_store;
pub mod source_reader;

pub use bookkeeping_store::BookkeepingStore;
pub use dispatcher::JobDispatcher;
pub use result_store::ResultStore;
pub use source_reader::{SourceCursor, SourceReader};
