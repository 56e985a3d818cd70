//! # Quill (blog platform identity backend)
//!
//! `quill` serves the user and authentication surface of the blog platform.
//!
//! ## Registration
//!
//! Registration is two-step. `POST /v1/auth/register` parks the hashed
//! account in the ephemeral store under `user_<email>` for 10 minutes and
//! mails a 6-digit code that lives for 1 minute. `POST /v1/auth/verify`
//! promotes the pending account into Postgres only when the code matches.
//!
//! ## Credentials
//!
//! Passwords are stored as Argon2id PHC strings. Successful login or
//! verification returns an HS256 bearer token valid for 360 days; the
//! forgot-password flow returns a 30 minute token that can only be used to
//! set a new password. Tokens are never stored server-side and there is no
//! revocation list.
//!
//! ## Email delivery
//!
//! Verification codes are generated, stored and mailed on a detached task.
//! The HTTP response never waits for delivery and delivery failures are only
//! logged.

pub mod api;
pub mod cache;
pub mod cli;
pub mod credentials;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
