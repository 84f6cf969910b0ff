use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// The platform refused to start playback without a user gesture
    #[error("Playback blocked: {0}")]
    Blocked(String),
    #[error("Cannot load {url}: {reason}")]
    Load { url: String, reason: String },
    #[error("Audio backend error: {0}")]
    Backend(String),
    #[error("Deferred start was aborted: {0}")]
    Aborted(String),
}

impl PlayerError {
    pub fn blocked(reason: impl Into<String>) -> Self {
        PlayerError::Blocked(reason.into())
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        PlayerError::Backend(reason.into())
    }
}
