use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("Logger error: {0}")]
    LoggerError(String),
}

/// Failure classification returned by a generation backend.
///
/// Only [`BackendError::Overloaded`] is retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Model overloaded")]
    Overloaded,
    #[error("Aborted")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Overloaded)
    }
}

/// Final outcome of a failed `generate` call. The `Display` text is exactly
/// what the controller stores in the `error` field of its state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Generation was aborted.")]
    Cancelled,
    #[error("Failed after {retries} retries.")]
    Exhausted { retries: u32 },
    #[error("{0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, StudioError>;
