//! Service layer: the cache coordinator, retrieval, and dispatch logic.

pub mod cache_coordinator;
pub mod dispatcher;
pub mod query_registry;
pub mod retrieval;
pub mod retry;

pub use cache_coordinator::CacheCoordinator;
pub use dispatcher::LocalDispatcher;
pub use query_registry::QueryRegistry;
pub use retrieval::{ReadOutcome, RetrievalService};
pub use retry::RetryPolicy;
