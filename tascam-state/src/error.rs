use thiserror::Error;

/// Error a listener may return from [`StatusListener::notify`](crate::StatusListener::notify)
///
/// Listener failures are logged by the registry and never interrupt delivery
/// to other listeners.
#[derive(Debug, Error)]
#[error("Listener failed: {message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors from status bookkeeping
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Listener {0} is not registered")]
    UnknownListener(u64),

    #[error("Frame parse error: {0}")]
    Parse(#[from] tascam_protocol::ParseError),
}

/// Result type for state operations
pub type Result<T> = std::result::Result<T, StateError>;
