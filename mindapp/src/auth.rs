//! Sign-in / sign-up form logic
//!
//! [`AuthForm`] holds the field values and the inline feedback of the
//! authentication screen. The actual calls go through an
//! [`AuthOperations`] implementation supplied by the host.

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Minimum password length accepted by the provider
pub const MIN_PASSWORD_LEN: usize = 6;

const SUBMIT_FALLBACK: &str = "An error occurred";
const RESET_FALLBACK: &str = "Failed to send password reset email";

/// Authentication collaborator
#[async_trait]
pub trait AuthOperations: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<()>;

    /// Creates the account; the provider sends a verification email
    async fn sign_up(&self, request: &SignUpRequest) -> Result<()>;

    async fn reset_password(&self, email: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        }
    }
}

/// Relationship of the emergency contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Parent,
    Spouse,
    Sibling,
    Child,
    Friend,
    Relative,
    Other,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Parent => "parent",
            Relationship::Spouse => "spouse",
            Relationship::Sibling => "sibling",
            Relationship::Child => "child",
            Relationship::Friend => "friend",
            Relationship::Relative => "relative",
            Relationship::Other => "other",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "parent" => Ok(Relationship::Parent),
            "spouse" | "partner" => Ok(Relationship::Spouse),
            "sibling" => Ok(Relationship::Sibling),
            "child" => Ok(Relationship::Child),
            "friend" => Ok(Relationship::Friend),
            "relative" => Ok(Relationship::Relative),
            "other" => Ok(Relationship::Other),
            other => Err(AuthError::Invalid(format!("Unknown relationship: {other}"))),
        }
    }
}

/// Account creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub username: String,
    pub phone_number: String,
    pub emergency_contact_number: String,
    pub emergency_contact_relationship: Option<Relationship>,
}

/// What the form currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStatus {
    #[default]
    Editing,
    /// Sign-up succeeded, a verification link was sent
    VerificationSent,
    /// A password reset link was sent
    ResetSent,
}

#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub username: String,
    pub phone_number: String,
    pub emergency_contact_number: String,
    pub emergency_contact_relationship: Option<Relationship>,
    mode: AuthMode,
    error: Option<String>,
    loading: bool,
    status: FormStatus,
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Inline error message, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True only while an operation is running
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    /// Whether "forgot your password" is enabled
    pub fn can_request_reset(&self) -> bool {
        self.mode == AuthMode::SignIn && !self.loading && !self.email.is_empty()
    }

    /// Follows a mode imposed by the host
    pub fn set_mode(&mut self, mode: AuthMode) {
        self.mode = mode;
    }

    /// Toggles sign-in / sign-up; returns the new mode
    ///
    /// The error is cleared, and going back to sign-in drops the sign-up
    /// only fields.
    pub fn switch_mode(&mut self) -> AuthMode {
        self.mode = self.mode.toggled();
        self.error = None;
        if self.mode == AuthMode::SignIn {
            self.username.clear();
            self.phone_number.clear();
            self.emergency_contact_number.clear();
            self.emergency_contact_relationship = None;
        }
        self.mode
    }

    /// "Back to sign in" from a confirmation screen
    pub fn back_to_sign_in(&mut self) {
        *self = AuthForm::new(AuthMode::SignIn);
    }

    pub fn sign_up_request(&self) -> SignUpRequest {
        SignUpRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            display_name: self.display_name.clone(),
            username: self.username.clone(),
            phone_number: self.phone_number.clone(),
            emergency_contact_number: self.emergency_contact_number.clone(),
            emergency_contact_relationship: self.emergency_contact_relationship,
        }
    }

    /// Required fields of the current mode
    fn validate(&self) -> std::result::Result<(), String> {
        let mut required = vec![("email", &self.email), ("password", &self.password)];
        if self.mode == AuthMode::SignUp {
            required.extend([
                ("username", &self.username),
                ("phone number", &self.phone_number),
                ("emergency contact number", &self.emergency_contact_number),
            ]);
        }
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(format!("Please enter your {field}"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        if self.mode == AuthMode::SignUp && self.emergency_contact_relationship.is_none() {
            return Err("Please select the emergency contact relationship".to_string());
        }
        Ok(())
    }

    /// Runs sign-in or sign-up depending on the mode
    ///
    /// Failures are stored as the inline error and returned.
    pub async fn submit(&mut self, ops: &dyn AuthOperations) -> Result<()> {
        self.error = None;
        if let Err(message) = self.validate() {
            self.error = Some(message.clone());
            return Err(AuthError::Invalid(message));
        }

        self.loading = true;
        let result = match self.mode {
            AuthMode::SignUp => {
                debug!(email = %self.email, "Signing up");
                ops.sign_up(&self.sign_up_request()).await
            }
            AuthMode::SignIn => {
                debug!(email = %self.email, "Signing in");
                ops.sign_in(&self.email, &self.password).await
            }
        };
        self.loading = false;

        match &result {
            Ok(()) if self.mode == AuthMode::SignUp => {
                info!(email = %self.email, "Verification email sent");
                self.status = FormStatus::VerificationSent;
            }
            Ok(()) => info!(email = %self.email, "Signed in"),
            Err(e) => {
                warn!(error = %e, mode = ?self.mode, "Authentication failed");
                self.error = Some(e.user_message(SUBMIT_FALLBACK));
            }
        }
        result
    }

    /// "Forgot your password?"
    pub async fn request_password_reset(&mut self, ops: &dyn AuthOperations) -> Result<()> {
        if self.email.is_empty() {
            let e = AuthError::MissingEmail;
            self.error = Some(e.to_string());
            return Err(e);
        }

        self.error = None;
        self.loading = true;
        let result = ops.reset_password(&self.email).await;
        self.loading = false;

        match &result {
            Ok(()) => {
                info!(email = %self.email, "Password reset email sent");
                self.status = FormStatus::ResetSent;
            }
            Err(e) => {
                warn!(error = %e, "Password reset failed");
                self.error = Some(e.user_message(RESET_FALLBACK));
            }
        }
        result
    }
}
