//! Top-level view selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed-in user as reported by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Session state published by the authentication provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub user: Option<User>,
    /// True while the session is being restored
    pub loading: bool,
}

impl AuthContext {
    pub fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

/// Screen displayed by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Loading,
    Dashboard,
    Auth,
    Landing,
}

impl AppView {
    /// Loading wins over everything, then a signed-in user, then the
    /// "get started" request.
    pub fn select(context: &AuthContext, show_auth: bool) -> Self {
        if context.loading {
            AppView::Loading
        } else if context.user.is_some() {
            AppView::Dashboard
        } else if show_auth {
            AppView::Auth
        } else {
            AppView::Landing
        }
    }
}

impl fmt::Display for AppView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppView::Loading => "loading",
            AppView::Dashboard => "dashboard",
            AppView::Auth => "auth",
            AppView::Landing => "landing",
        })
    }
}

/// Application root: remembers whether the visitor asked to get started
#[derive(Debug, Default)]
pub struct AppShell {
    show_auth: bool,
}

impl AppShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// "Get started" on the landing page
    pub fn get_started(&mut self) {
        self.show_auth = true;
    }

    pub fn view(&self, context: &AuthContext) -> AppView {
        AppView::select(context, self.show_auth)
    }
}
