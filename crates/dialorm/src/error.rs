//! Error types for dialorm

use thiserror::Error;

use crate::params::Direction;

/// Result type alias for dialorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for command building and metadata handling.
///
/// All errors are raised synchronously at the point of violation; nothing is
/// retried internally.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Invalid table/key/sequence configuration, or a missing table name.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Partial primary key presence, or partial default-key state.
    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    /// The dialect cannot express what the parameter requires
    /// (anonymous parameters, cursors, untyped output nulls).
    #[error("Parameter \"{parameter}\": {message}")]
    ParameterCapability { parameter: String, message: String },

    /// Row-count sentinel used on a parameter that is not an output parameter.
    #[error(
        "{direction:?} parameter \"{parameter}\" is invalid: the row-count sentinel can only be used on Output parameters"
    )]
    RowCountMisuse {
        parameter: String,
        direction: Direction,
    },

    /// Introspection query or table info normalization failure.
    #[error("Metadata error for table '{table}': {message}")]
    Metadata { table: String, message: String },

    /// Identifier validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A value could not be converted into the target field type
    #[error("Conversion error on column '{column}': {message}")]
    Conversion { column: String, message: String },

    /// No dialect is registered for the provider identifier
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a key mismatch error
    pub fn key_mismatch(message: impl Into<String>) -> Self {
        Self::KeyMismatch(message.into())
    }

    /// Create a parameter capability error for a specific parameter
    pub fn parameter_capability(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParameterCapability {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a metadata error for a specific table
    pub fn metadata(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Metadata {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a conversion error for a specific column
    pub fn conversion(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a key mismatch error
    pub fn is_key_mismatch(&self) -> bool {
        matches!(self, Self::KeyMismatch(_))
    }

    /// Check if this is a parameter capability error
    pub fn is_parameter_capability(&self) -> bool {
        matches!(self, Self::ParameterCapability { .. })
    }

    /// Check if this is a row-count misuse error
    pub fn is_row_count_misuse(&self) -> bool {
        matches!(self, Self::RowCountMisuse { .. })
    }

    /// Check if this is a metadata error
    pub fn is_metadata(&self) -> bool {
        matches!(self, Self::Metadata { .. })
    }
}
