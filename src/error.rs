//! Error types for the IRC client engine.
//!
//! Protocol anomalies are deliberately *not* errors: an unparsable line is
//! logged and dropped (see [`crate::parser`]). The types here cover the
//! failures that can actually abort an operation — socket I/O and
//! configuration loading.

use thiserror::Error;

/// Convenience type alias for Results using [`EngineError`].
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors raised by the connection manager.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// I/O error during connecting, reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The connect attempt did not complete within the configured timeout.
    #[error("connect to {host}:{port} timed out")]
    ConnectTimeout {
        /// Server hostname.
        host: String,
        /// Server port.
        port: u16,
    },

    /// An operation that requires a live socket was called without one.
    #[error("not connected")]
    NotConnected,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration was not valid JSON of the expected shape.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
