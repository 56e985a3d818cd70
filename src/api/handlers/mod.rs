//! API handlers for quill.
//!
//! `auth` owns the registration, login and recovery flows plus the shared
//! state; `users` serves profiles; `health` and `root` are operational.

pub mod auth;
pub mod health;
pub mod root;
pub mod users;
