use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the searchbridge application
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Input validation failures raised before any backend contact.
    /// The message is surfaced verbatim to the caller.
    #[error("{0}")]
    InvalidInput(String),

    /// The backend client failed to construct at startup
    #[error("Search client is not initialized. Check server logs for details.")]
    NotInitialized,

    /// Backend call or response decoding failures
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for searchbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
