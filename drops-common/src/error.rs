//! Shared error type for the drops crates

use thiserror::Error;

/// Result alias used by the store and configuration layers
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by persistence and configuration plumbing
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite access failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap TOML file exists but could not be parsed
    #[error("Malformed TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A setting or table row holds a value that cannot be interpreted
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied a value outside the accepted domain
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
