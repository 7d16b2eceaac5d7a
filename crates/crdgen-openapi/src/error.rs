//! Schema generation errors

use thiserror::Error;

/// Errors raised while rendering CRDs for a channel
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Field refers to a message or enum missing from the descriptor set
    #[error("unresolved type '{type_name}' referenced by field '{field}'")]
    UnresolvedType { field: String, type_name: String },

    /// Resource tags are incomplete or malformed
    #[error("invalid resource tags on {message}: {reason}")]
    InvalidTag { message: String, reason: String },

    /// More than one version of a resource claims to be the storage version
    #[error("multiple storage versions for {kind}.{group}: {first} and {second}")]
    ConflictingStorageVersion {
        kind: String,
        group: String,
        first: String,
        second: String,
    },

    /// The same resource version is declared by two messages
    #[error("duplicate version {version} of {kind}.{group} declared by {first} and {second}")]
    DuplicateVersion {
        kind: String,
        group: String,
        version: String,
        first: String,
        second: String,
    },

    /// YAML encoding failed
    #[error("yaml encoding error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for schema generation
pub type SchemaResult<T> = Result<T, SchemaError>;
