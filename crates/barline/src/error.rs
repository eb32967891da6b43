use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BarError>;

#[derive(Debug, Error)]
pub enum BarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("could not serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("invalid config value: {message}")]
    InvalidConfig { message: String },

    #[error("invalid log filter {filter:?}: {message}")]
    LogFilter { filter: String, message: String },

    #[error("{message}")]
    Exit { code: i32, message: String },
}

impl BarError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code, .. } => *code,
            Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::InvalidConfig { .. }
            | Self::LogFilter { .. } => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn exit(code: i32, message: impl Into<String>) -> Self {
        Self::Exit {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
