//! Error types for channel-gate.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configuration and the Bot API transport.
///
/// Expected gate conditions (rate limiting, missing membership, failed
/// uploads) are typed outcomes, not errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O failure (config file, artifact source).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Bot API answered with `ok = false`.
    #[error("Bot API error {code}: {description}")]
    Api {
        /// Error code reported by the API.
        code: i64,
        /// Human readable description reported by the API.
        description: String,
    },

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A response decoded but did not carry what the call promises.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
