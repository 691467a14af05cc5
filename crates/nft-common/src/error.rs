//! Error types shared across nft-tools crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A setting (usually from an environment variable) could not be parsed
    #[error("Invalid value '{value}' for {key}")]
    InvalidSetting { key: String, value: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl CommonError {
    pub fn invalid_setting(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }
}
