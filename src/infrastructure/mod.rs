//! Infrastructure layer: configuration and other process-level concerns.

pub mod config;
pub mod logging;
