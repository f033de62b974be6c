//! Error types for resource construction.

use thiserror::Error;

/// Errors raised while building resource instances from raw attributes.
///
/// Fetch failures never show up here: they are absorbed by the lifecycle and
/// reported through the configured error handler.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResourceError {
    /// The attributes did not contain the identity field.
    #[error("Missing identity field `{field}`")]
    MissingIdentity { field: String },

    /// The identity field held something other than a number or a string.
    #[error("Invalid identity in `{field}`: {value}")]
    InvalidIdentity { field: String, value: String },

    /// Attributes must be a JSON object.
    #[error("Expected an object of attributes, got {0}")]
    NotAnObject(String),
}
