//! Core error types for the kernel gateway client

use kg_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the client
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Top-level error type for gateway operations
///
/// Composed operations return the first error they hit unchanged, so the
/// variant always names the step that failed.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A URL could not be parsed or resolved against its base
    #[error("Invalid address: {0}")]
    Address(String),

    /// A payload could not be serialized
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A response body or inbound frame could not be parsed
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Network failure while sending, receiving, or on a closed channel
    #[error("Transport error: {0}")]
    Transport(String),

    /// The WebSocket handshake failed
    #[error("Connect error: {0}")]
    Connect(String),

    /// The gateway answered with a non-success HTTP status
    #[error("Gateway returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// The caller's cancellation token fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ProtocolError> for GatewayError {
    fn from(err: ProtocolError) -> Self {
        if err.is_encoding() {
            GatewayError::Encoding(err.to_string())
        } else {
            GatewayError::Decoding(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
