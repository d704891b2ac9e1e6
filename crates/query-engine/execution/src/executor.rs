//! The database driver seam.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

/// Whether a statement may be routed to a read replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// A failure reported by the database, with the message it returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct DatabaseError {
    pub message: String,
}

impl DatabaseError {
    pub fn new(message: impl Into<String>) -> Self {
        DatabaseError {
            message: message.into(),
        }
    }
}

/// Runs a statement and returns the value of the result column of every row.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(
        &self,
        statement: &str,
        parameters: &IndexMap<String, Value>,
        mode: AccessMode,
    ) -> Result<Vec<Value>, DatabaseError>;
}
