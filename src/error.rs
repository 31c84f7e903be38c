//! Error types for metadata inference

use thiserror::Error;

/// Errors that can occur while building or serving document-store metadata
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    /// The data-source address does not identify a database
    #[error("Unsupported data source address: {0}")]
    InvalidAddress(String),

    /// Invalid configuration fragment
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid document structure (not an object at root)
    #[error("Invalid document structure: expected object at root, found {0}")]
    InvalidStructure(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Document source error
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl MetadataError {
    /// Whether this error stems from configuration rather than data
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MetadataError::InvalidAddress(_) | MetadataError::InvalidConfig(_)
        )
    }
}

impl From<serde_json::Error> for MetadataError {
    fn from(e: serde_json::Error) -> Self {
        MetadataError::JsonParse(e.to_string())
    }
}

/// Errors raised by a document source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Collection names could not be listed
    #[error("Failed to list collections: {0}")]
    ListCollections(String),

    /// Collection does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// A document could not be read
    #[error("Read error in collection {collection}: {reason}")]
    Read { collection: String, reason: String },
}
