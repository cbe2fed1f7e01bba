//! Error types for GatiDrive

use thiserror::Error;

/// GatiDrive error type
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for DriveError {
    fn from(e: toml::de::Error) -> Self {
        DriveError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DriveError>;
