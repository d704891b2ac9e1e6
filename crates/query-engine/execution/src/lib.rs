pub mod cache;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod query;
