//! Error types for channel classification and output assembly.

use thiserror::Error;

/// Boxed error returned by schema generators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that abort a generation request.
///
/// Every variant is fatal: no partial response is ever produced.
#[derive(Error, Debug)]
pub enum Error {
    /// Parameter key not recognised by the plugin
    #[error("unknown argument '{key}' specified")]
    UnknownParameter { key: String },

    /// Boolean parameter with a value other than `true`/`false`
    #[error("unknown value '{value}' for {key}")]
    InvalidParameterValue { key: String, value: String },

    /// File listed in `file_to_generate` missing from `proto_file`
    #[error("unable to find {0}")]
    FileNotFound(String),

    /// Schema generation failed for a channel
    #[error("failed to generate channel '{channel}': {source}")]
    Generation {
        channel: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Whether the error stems from the plugin parameter string.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::UnknownParameter { .. } | Self::InvalidParameterValue { .. }
        )
    }
}

/// Result type alias using the crdgen core error.
pub type Result<T> = std::result::Result<T, Error>;
