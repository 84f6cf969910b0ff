use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure reported by the authentication provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("User already registered")]
    AlreadyRegistered,
    #[error("{0}")]
    Provider(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Please enter your email address first")]
    MissingEmail,
    /// Rejected before reaching the provider
    #[error("{0}")]
    Invalid(String),
}

impl AuthError {
    pub fn provider(message: impl Into<String>) -> Self {
        AuthError::Provider(message.into())
    }

    /// Message shown inline, `fallback` when the provider gave none
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}
