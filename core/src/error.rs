use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForensicError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid threshold list '{field}': must be non-empty and strictly ascending")]
    InvalidThresholds { field: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ForensicResult<T> = Result<T, ForensicError>;
