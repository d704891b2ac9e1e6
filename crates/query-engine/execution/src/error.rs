//! Errors for execution.

use query_engine_cypher::cypher::helpers::FORBIDDEN_SIGNAL;

use crate::executor::DatabaseError;

/// Errors raised while running a compiled statement.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A validation guard rejected the request.
    #[error("Forbidden")]
    Forbidden,
    #[error("Database error: {0}")]
    Database(DatabaseError),
    #[error("Unable to serialize the result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Self {
        if error.message.contains(FORBIDDEN_SIGNAL) {
            Error::Forbidden
        } else {
            Error::Database(error)
        }
    }
}
