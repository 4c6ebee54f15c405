use crate::object::ObjectId;
use std::path::PathBuf;
use thiserror::Error;

/// refgraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Failed to read snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Result type alias for refgraph operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create an invalid snapshot error
    pub fn invalid_snapshot(msg: impl Into<String>) -> Self {
        Error::InvalidSnapshot(msg.into())
    }

    /// Create an argument validation error
    pub fn argument(msg: impl Into<String>) -> Self {
        Error::Argument(msg.into())
    }
}
