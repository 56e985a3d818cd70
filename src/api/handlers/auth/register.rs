//! Two-step registration endpoints.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::error::AuthError;
use super::state::AuthState;
use super::types::{RegisterRequest, ResponseSuccess, VerifyRequest};
use super::utils::require_payload;

/// Park the account and mail a registration code.
///
/// Responds as soon as the pending record is written; delivery happens on a
/// detached task.
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = require_payload(payload)?;
    auth_state.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ResponseSuccess::new("Verification code has been sent!")),
    ))
}

/// Confirm the registration code and create the user.
pub async fn verify(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = require_payload(payload)?;
    let response = auth_state.verify(&request.email, &request.code).await?;
    Ok((StatusCode::OK, Json(response)))
}
