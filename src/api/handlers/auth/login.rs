use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::error::AuthError;
use super::state::AuthState;
use super::types::LoginRequest;
use super::utils::require_payload;

pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = require_payload(payload)?;
    let response = auth_state.login(&request.email, &request.password).await?;
    Ok((StatusCode::OK, Json(response)))
}
