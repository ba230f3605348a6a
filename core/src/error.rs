use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No target months in the dataset; cannot derive an analysis quarter")]
    NoTargetMonths,

    #[error("No dated deals in the dataset; cannot derive driver months")]
    NoDealMonths,

    #[error("Unknown endpoint '{path}'")]
    UnknownEndpoint { path: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;
