//! Request and response payloads for auth endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::User;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Used by both `/verify` and `/verify-forgot-password`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

/// Profile plus a freshly issued bearer token.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: String,
    pub created_at: String,
    pub access_token: String,
}

impl AuthResponse {
    pub(crate) fn new(user: User, access_token: String) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            access_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseSuccess {
    pub success: String,
}

impl ResponseSuccess {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            success: message.to_string(),
        }
    }
}
