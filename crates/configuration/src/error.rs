//! Errors that can occur while handling the configuration.

use std::path::PathBuf;

use query_engine_models::{FieldName, TypeName};

/// The errors that can be thrown when parsing a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported configuration version {0}")]
    UnsupportedVersion(u32),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when writing a configuration.
#[derive(Debug, thiserror::Error)]
pub enum WriteParsedConfigurationError {
    #[error("unable to serialize the configuration: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A schema model that refers to things it does not define.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("entity '{0}' declares no labels")]
    MissingLabels(TypeName),
    #[error("relationship '{type_name}.{relationship}' targets unknown type '{target}'")]
    UnknownRelationshipTarget {
        type_name: TypeName,
        relationship: FieldName,
        target: TypeName,
    },
    #[error("interface '{interface}' lists unknown implementation '{implementation}'")]
    UnknownImplementation {
        interface: TypeName,
        implementation: TypeName,
    },
    #[error("union '{union}' lists unknown member '{member}'")]
    UnknownMember { union: TypeName, member: TypeName },
    #[error("fulltext index '{index}' of '{type_name}' covers unknown attribute '{field}'")]
    UnknownFulltextField {
        type_name: TypeName,
        index: String,
        field: FieldName,
    },
}
