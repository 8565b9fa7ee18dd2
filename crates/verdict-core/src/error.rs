use thiserror::Error;

/// Core error type shared across Verdict crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Dataset access failed (network, timeout, backend error).
    #[error("data source error: {0}")]
    DataSource(String),
    /// The requested workspace/dataset/table does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The dataset content could not be materialized as records.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results returned by Verdict crates.
pub type Result<T> = std::result::Result<T, Error>;
