use thiserror::Error;

use crate::logging::LoggingError;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Invalid command: {0}")]
    Validation(#[from] tascam_protocol::ValidationError),

    #[error("Link error: {0}")]
    Link(#[from] tascam_link::LinkError),

    #[error("State management error: {0}")]
    State(#[from] tascam_state::StateError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Invalid deck configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Failed to start link worker: {0}")]
    Worker(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SdkError>;
