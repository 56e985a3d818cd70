use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure of an auth or user operation, rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("email is already exists")]
    EmailExists,
    #[error("username is already taken")]
    UsernameTaken,
    #[error("not found")]
    NotFound,
    #[error("verification is expired")]
    CodeExpired,
    #[error("incorrect verification code")]
    IncorrectCode,
    #[error("wrong email or password")]
    WrongEmailOrPassword,
    #[error("forbidden")]
    Forbidden,
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::EmailExists | Self::UsernameTaken => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::CodeExpired
            | Self::IncorrectCode
            | Self::WrongEmailOrPassword
            | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AuthError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::EmailExists.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::CodeExpired.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::IncorrectCode.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::WrongEmailOrPassword.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Internal(anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn code_errors_keep_wire_messages() {
        assert_eq!(AuthError::CodeExpired.to_string(), "verification is expired");
        assert_eq!(
            AuthError::IncorrectCode.to_string(),
            "incorrect verification code"
        );
        assert_eq!(AuthError::EmailExists.to_string(), "email is already exists");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let response = AuthError::Internal(anyhow!("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
