//! Auth handlers and supporting modules.
//!
//! This module coordinates two-step registration, password login and the
//! forgot-password flow.
//!
//! ## Ephemeral keys
//!
//! All short-lived state sits in the `CodeStore` under email-derived keys:
//!
//! - `user_<email>`: pending registration (JSON), 10 minutes.
//! - `register_code_<email>`: registration code, 1 minute.
//! - `forgot_password_key_<email>`: password reset code, 1 minute.
//!
//! Writing a key replaces the previous value, so only the newest code for a
//! given flow and email can match.
//!
//! ## Tokens
//!
//! Verify and login return a 360 day access token. Verify-forgot-password
//! returns a 30 minute reset token that `update-password` accepts and every
//! other authenticated route rejects.

mod dispatch;
mod error;
pub(crate) mod login;
pub(crate) mod principal;
pub(crate) mod recovery;
pub(crate) mod register;
mod state;
pub(crate) mod types;
pub(crate) mod utils;
mod workflow;

pub use dispatch::CodeDispatcher;
pub use error::AuthError;
pub use state::{AuthConfig, AuthState};
