use thiserror::Error;

#[derive(Error, Debug)]
pub enum QregvarError {
    #[error("Insufficient history: {available} observations, at least {required} required")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Non-identifiable fit: {0}")]
    NonIdentifiableFit(String),

    #[error("Degenerate exceedance sequence: {0}")]
    DegenerateExceedanceSequence(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QregvarError>;
