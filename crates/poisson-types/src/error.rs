use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoissonError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to allocate {what} of {cells} cells")]
    ResourceExhausted { what: &'static str, cells: usize },

    #[error("Input format error at line {line}: {message}")]
    InputFormat { line: usize, message: String },

    #[error("Message channel error: {0}")]
    Channel(String),

    #[error("Run aborted by worker {rank}")]
    Aborted { rank: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoissonError {
    /// Errors that are caused by a peer rather than by this worker.
    pub fn is_remote(&self) -> bool {
        matches!(self, PoissonError::Aborted { .. })
    }
}

pub type PoissonResult<T> = Result<T, PoissonError>;
