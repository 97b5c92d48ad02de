use thiserror::Error;

pub type SegmentationResult<T> = Result<T, SegmentationError>;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Contact data unavailable: {0}")]
    DataUnavailable(#[source] anyhow::Error),

    #[error("Inconsistent audience state: {0}")]
    InconsistentState(String),

    #[error("Audience not found: {0}")]
    AudienceNotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}
