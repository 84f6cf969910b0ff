//! Error types for sound resolution and fetching

/// Result type alias for sound operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when resolving or fetching sounds
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identifier is not part of the sound catalogue
    #[error("Unknown sound: {0}")]
    UnknownSound(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Download of {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (from mindconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// The audio subtree of the configuration could not be decoded
    #[error("Invalid audio configuration: {0}")]
    InvalidConfig(#[from] serde_yaml::Error),
}
