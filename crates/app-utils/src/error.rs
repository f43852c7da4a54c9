use core_logic::PolicyError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors for the `app-utils` crate
#[derive(Error, Debug)]
pub enum Error {
    /// The policy file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file extension does not name a supported format
    #[error("unsupported policy format `{0}` (expected yaml, yml, toml or json)")]
    UnsupportedFormat(String),

    /// Parsing failed in the given format
    #[error("{format} parsing failed: {message}")]
    Parse {
        /// Format name
        format: &'static str,
        /// Parser message, including document limit violations
        message: String,
    },

    /// Serializing a document failed
    #[error("{format} serialization failed: {message}")]
    Serialize {
        /// Format name
        format: &'static str,
        /// Serializer message
        message: String,
    },

    /// The document parsed but was rejected by the engine
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
