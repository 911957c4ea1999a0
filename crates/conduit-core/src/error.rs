use thiserror::Error;

/// Top-level error type for Conduit infrastructure.
///
/// Covers the concerns every crate shares (configuration, I/O,
/// serialization, shutdown). Dispatch and protocol failures have their own
/// typed enums in `conduit-action` and `conduit-chat`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConduitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for ConduitError {
    fn from(err: toml::de::Error) -> Self {
        ConduitError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ConduitError {
    fn from(err: toml::ser::Error) -> Self {
        ConduitError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ConduitError {
    fn from(err: serde_json::Error) -> Self {
        ConduitError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Conduit infrastructure operations.
pub type Result<T> = std::result::Result<T, ConduitError>;
