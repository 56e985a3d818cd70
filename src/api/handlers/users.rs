//! User profile endpoints.
//!
//! Flow Overview:
//! 1) Reads are public except `/v1/users/me`, which needs an access token.
//! 2) Updates and deletes need an access token for the same user, or for a
//!    `superadmin`.
//! 3) Creating a user directly (any role, no email code) is reserved for a
//!    `superadmin`.
//! 4) Reset tokens are never accepted here.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::auth::principal::{require_auth, Principal};
use super::auth::types::ResponseSuccess;
use super::auth::utils::{
    check_max_chars, require_payload, validate_email, validate_names, validate_password,
    PHONE_MAX_CHARS, USERNAME_MAX_CHARS,
};
use super::auth::{AuthError, AuthState};
use crate::credentials::{PasswordHasher, TokenPurpose};
use crate::storage::{
    CreateOutcome, NewUser, ProfileUpdate, UpdateOutcome, User, ROLES, ROLE_SUPERADMIN, ROLE_USER,
};

const GENDERS: [&str; 2] = ["male", "female"];

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub email: String,
    pub gender: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(rename = "type")]
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            email: user.email,
            gender: user.gender,
            username: user.username,
            profile_image_url: user.profile_image_url,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdateRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCreateRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(rename = "type")]
    pub role: Option<String>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<UserUpdateRequest> for ProfileUpdate {
    type Error = AuthError;

    fn try_from(request: UserUpdateRequest) -> Result<Self, Self::Error> {
        let (first_name, last_name) = validate_names(&request.first_name, &request.last_name)?;

        let phone_number = blank_to_none(request.phone_number);
        if let Some(phone_number) = phone_number.as_deref() {
            check_max_chars("phone_number", phone_number, PHONE_MAX_CHARS)?;
        }
        let username = blank_to_none(request.username);
        if let Some(username) = username.as_deref() {
            check_max_chars("username", username, USERNAME_MAX_CHARS)?;
        }

        let gender = blank_to_none(request.gender).map(|g| g.to_lowercase());
        if let Some(gender) = gender.as_deref() {
            if !GENDERS.contains(&gender) {
                return Err(AuthError::Validation(
                    "gender must be male or female".to_string(),
                ));
            }
        }

        Ok(Self {
            first_name,
            last_name,
            phone_number,
            gender,
            username,
            profile_image_url: blank_to_none(request.profile_image_url),
        })
    }
}

/// Validate a direct creation request and hash its password.
fn new_user(request: UserCreateRequest, hasher: &PasswordHasher) -> Result<NewUser, AuthError> {
    let email = validate_email(&request.email)?;
    validate_password(&request.password)?;

    let role = blank_to_none(request.role).map_or_else(|| ROLE_USER.to_string(), |r| r.to_lowercase());
    if !ROLES.contains(&role.as_str()) {
        return Err(AuthError::Validation(
            "type must be user or superadmin".to_string(),
        ));
    }

    let profile = ProfileUpdate::try_from(UserUpdateRequest {
        first_name: request.first_name,
        last_name: request.last_name,
        phone_number: request.phone_number,
        gender: request.gender,
        username: request.username,
        profile_image_url: request.profile_image_url,
    })?;

    Ok(NewUser::new(
        profile.first_name.clone(),
        profile.last_name.clone(),
        email,
        hasher.hash(&request.password)?,
        &role,
    )
    .with_profile(profile))
}

fn parse_user_id(raw: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(raw).map_err(|_| AuthError::Validation("invalid user id".to_string()))
}

async fn require_superadmin(auth_state: &AuthState, principal: &Principal) -> Result<(), AuthError> {
    match auth_state.users().get(principal.user_id).await? {
        Some(caller) if caller.role == ROLE_SUPERADMIN => Ok(()),
        _ => Err(AuthError::Forbidden),
    }
}

/// Allow the user themself or a superadmin.
async fn require_owner_or_superadmin(
    auth_state: &AuthState,
    principal: &Principal,
    target: Uuid,
) -> Result<(), AuthError> {
    if principal.user_id == target {
        return Ok(());
    }
    require_superadmin(auth_state, principal).await
}

/// Create a user with any role, skipping email verification.
pub async fn create_user(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UserCreateRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, auth_state.tokens(), &[TokenPurpose::Access])?;
    require_superadmin(&auth_state, &principal).await?;

    let user = new_user(require_payload(payload)?, auth_state.hasher())?;

    match auth_state.users().create(user).await? {
        CreateOutcome::Created(user) => {
            info!(user_id = %user.id, actor = %principal.user_id, role = %user.role, "User created");
            Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
        }
        CreateOutcome::EmailTaken => Err(AuthError::EmailExists),
        CreateOutcome::UsernameTaken => Err(AuthError::UsernameTaken),
    }
}

pub async fn me(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, auth_state.tokens(), &[TokenPurpose::Access])?;
    let user = auth_state
        .users()
        .get(principal.user_id)
        .await?
        .ok_or(AuthError::NotFound)?;
    Ok((StatusCode::OK, Json(UserResponse::from(user))))
}

pub async fn get_user(
    Path(id): Path<String>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let id = parse_user_id(&id)?;
    let user = auth_state
        .users()
        .get(id)
        .await?
        .ok_or(AuthError::NotFound)?;
    Ok((StatusCode::OK, Json(UserResponse::from(user))))
}

pub async fn update_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UserUpdateRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, auth_state.tokens(), &[TokenPurpose::Access])?;
    let id = parse_user_id(&id)?;
    require_owner_or_superadmin(&auth_state, &principal, id).await?;
    let update = ProfileUpdate::try_from(require_payload(payload)?)?;

    match auth_state.users().update_profile(id, update).await? {
        UpdateOutcome::Updated(user) => {
            info!(user_id = %id, actor = %principal.user_id, "User profile updated");
            Ok((StatusCode::OK, Json(UserResponse::from(user))))
        }
        UpdateOutcome::NotFound => Err(AuthError::NotFound),
        UpdateOutcome::Conflict => Err(AuthError::UsernameTaken),
    }
}

pub async fn delete_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, auth_state.tokens(), &[TokenPurpose::Access])?;
    let id = parse_user_id(&id)?;
    require_owner_or_superadmin(&auth_state, &principal, id).await?;

    if !auth_state.users().delete(id).await? {
        return Err(AuthError::NotFound);
    }
    info!(user_id = %id, actor = %principal.user_id, "User deleted");
    Ok((
        StatusCode::OK,
        Json(ResponseSuccess::new("Successfully deleted")),
    ))
}
