//! Authenticated principal extraction.
//!
//! Flow Overview: read the bearer token, verify signature and expiry, and
//! check the token purpose against what the route accepts. Role checks need
//! the stored user and happen in the handlers that care.

use axum::http::HeaderMap;
use tracing::debug;
use uuid::Uuid;

use crate::credentials::{TokenIssuer, TokenPurpose};

use super::error::AuthError;
use super::utils::extract_bearer;

/// Caller identity taken from a verified bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub purpose: TokenPurpose,
}

/// Resolve the bearer token into a principal, or `Unauthorized`.
pub fn require_auth(
    headers: &HeaderMap,
    tokens: &TokenIssuer,
    accepted: &[TokenPurpose],
) -> Result<Principal, AuthError> {
    let token = extract_bearer(headers).ok_or(AuthError::Unauthorized)?;
    let claims = tokens.verify(token).map_err(|err| {
        debug!("Rejected bearer token: {err}");
        AuthError::Unauthorized
    })?;

    if !accepted.contains(&claims.purpose) {
        debug!("Bearer token purpose {:?} not accepted here", claims.purpose);
        return Err(AuthError::Unauthorized);
    }

    Ok(Principal {
        user_id: claims.sub,
        email: claims.email,
        purpose: claims.purpose,
    })
}
