use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Circuit '{id}' not found")]
    CircuitNotFound { id: String },

    #[error("Failed to load data from {path}: {reason}")]
    DataLoad { path: String, reason: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
