//! Password recovery endpoints.
//!
//! `forgot-password` mails a code, `verify-forgot-password` trades it for a
//! 30 minute reset token, and `update-password` sets the new password for
//! whoever the bearer token names.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::credentials::TokenPurpose;

use super::error::AuthError;
use super::principal::require_auth;
use super::state::AuthState;
use super::types::{ForgotPasswordRequest, ResponseSuccess, UpdatePasswordRequest, VerifyRequest};
use super::utils::require_payload;

pub async fn forgot_password(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = require_payload(payload)?;
    auth_state.forgot_password(&request.email).await?;
    Ok((
        StatusCode::CREATED,
        Json(ResponseSuccess::new("Validation code has been sent")),
    ))
}

pub async fn verify_forgot_password(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = require_payload(payload)?;
    let response = auth_state
        .verify_forgot_password(&request.email, &request.code)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_password(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdatePasswordRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(
        &headers,
        auth_state.tokens(),
        &[TokenPurpose::Access, TokenPurpose::PasswordReset],
    )?;
    let request = require_payload(payload)?;
    auth_state
        .update_password(&principal, &request.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ResponseSuccess::new("Password has been updated!")),
    ))
}
