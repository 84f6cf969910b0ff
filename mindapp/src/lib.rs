//! # mindapp
//!
//! Host-independent logic of the Mindshift application shell: which screen
//! to show for the current session ([`AppView`]) and the behaviour of the
//! authentication form ([`AuthForm`]).
//!
//! The authentication provider itself is out of reach of this crate; hosts
//! plug it in through [`AuthOperations`].

pub mod auth;
pub mod error;
pub mod view;

pub use auth::{
    AuthForm, AuthMode, AuthOperations, FormStatus, Relationship, SignUpRequest,
    MIN_PASSWORD_LEN,
};
pub use error::{AuthError, Result};
pub use view::{AppShell, AppView, AuthContext, User};
