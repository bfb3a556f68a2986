//! Error types for colmap
//!
//! Provides a unified error type for mapping, indexing and query operations.

use thiserror::Error;

/// Result type alias using ColmapError
pub type Result<T> = std::result::Result<T, ColmapError>;

/// Unified error type for colmap operations
#[derive(Debug, Error)]
pub enum ColmapError {
    // -------------------------------------------------------------------------
    // Mapping Errors
    // -------------------------------------------------------------------------
    /// Bad or missing record-type metadata. Fatal for that record type.
    #[error("Mapping error for {entity}: {message}")]
    Mapping { entity: String, message: String },

    #[error("Cannot save {entity} with an empty row key")]
    MissingRowKey { entity: String },

    #[error("Unable to write property '{field}': {message}")]
    PropertyWrite { field: String, message: String },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported value type: {0}")]
    UnsupportedValueType(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    /// Store failure while creating or consuming a scan
    #[error("Query failed: {0}")]
    Query(#[source] Box<ColmapError>),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    #[error("No handle for table '{table}' available after {waited_ms} ms")]
    PoolTimeout { table: String, waited_ms: u64 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ColmapError {
    /// Build a mapping error for the named entity
    pub fn mapping(entity: impl Into<String>, message: impl Into<String>) -> Self {
        ColmapError::Mapping {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Wrap a store-level failure as a query failure.
    ///
    /// Already-wrapped failures are passed through so the cause is never nested twice.
    pub fn into_query(self) -> Self {
        match self {
            ColmapError::Query(_) => self,
            other => ColmapError::Query(Box::new(other)),
        }
    }
}

impl From<bincode::Error> for ColmapError {
    fn from(err: bincode::Error) -> Self {
        ColmapError::Serialization(err.to_string())
    }
}
