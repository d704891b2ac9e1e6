//! Errors for translation.

use query_engine_metadata::metadata::Capability;
use query_engine_models::{FieldName, TypeName};

/// A type for translation errors. All of them are raised before any clause is emitted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Type '{0}' not found.")]
    TypeNotFound(TypeName),
    #[error("Field '{field}' not found on type '{type_name}'.")]
    FieldNotFound { type_name: TypeName, field: FieldName },
    #[error("Relationship '{relationship}' not found on type '{type_name}'.")]
    RelationshipNotFound {
        type_name: TypeName,
        relationship: FieldName,
    },
    #[error("Root field '{0}' not found.")]
    RootFieldNotFound(FieldName),
    #[error("Invalid filter at '{path}': {message}")]
    InvalidFilter { path: String, message: String },
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },
    #[error("Operation {capability} is not allowed on type '{type_name}'.")]
    CapabilityNotAllowed {
        type_name: TypeName,
        capability: Capability,
    },
    #[error("Field '{field}' is not supported: {message}")]
    UnsupportedField { field: FieldName, message: String },
    #[error("Invalid cursor '{0}'.")]
    InvalidCursor(String),
    #[error("Traversal without a bound node: {0}")]
    UnboundTraversal(String),
}

impl Error {
    /// Whether the error is caused by the request, as opposed to an internal fault.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Error::UnboundTraversal(_))
    }
}
