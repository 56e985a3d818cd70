//! Small helpers for auth validation, cache keys and code generation.

use anyhow::{Context, Result};
use axum::{
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use subtle::ConstantTimeEq;

use super::error::AuthError;

pub(super) const PASSWORD_MIN_CHARS: usize = 8;
pub(super) const PASSWORD_MAX_CHARS: usize = 128;

// Column widths of the `users` table.
pub(crate) const NAME_MAX_CHARS: usize = 50;
pub(crate) const EMAIL_MAX_CHARS: usize = 100;
pub(crate) const PHONE_MAX_CHARS: usize = 20;
pub(crate) const USERNAME_MAX_CHARS: usize = 30;

const PENDING_PREFIX: &str = "user_";
const REGISTER_CODE_PREFIX: &str = "register_code_";
const FORGOT_PASSWORD_PREFIX: &str = "forgot_password_key_";

/// Which flow a verification code belongs to. Each purpose has its own key
/// namespace, so a registration code never satisfies a password reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CodePurpose {
    Register,
    ForgotPassword,
}

impl CodePurpose {
    pub(crate) fn key(self, email: &str) -> String {
        match self {
            Self::Register => format!("{REGISTER_CODE_PREFIX}{email}"),
            Self::ForgotPassword => format!("{FORGOT_PASSWORD_PREFIX}{email}"),
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::ForgotPassword => "forgot_password",
        }
    }
}

/// Cache key of the pending registration for `email`.
pub(super) fn pending_key(email: &str) -> String {
    format!("{PENDING_PREFIX}{email}")
}

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub(super) fn valid_password(password: &str) -> bool {
    let chars = password.chars().count();
    (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&chars)
}

/// Reject `value` when it does not fit the `field` column.
pub(crate) fn check_max_chars(field: &str, value: &str, max: usize) -> Result<(), AuthError> {
    if value.chars().count() > max {
        return Err(AuthError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Normalize and validate an email, returning the stored form.
pub(crate) fn validate_email(raw: &str) -> Result<String, AuthError> {
    let email = normalize_email(raw);
    check_max_chars("email", &email, EMAIL_MAX_CHARS)?;
    if !valid_email(&email) {
        return Err(AuthError::Validation("invalid email".to_string()));
    }
    Ok(email)
}

pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    if valid_password(password) {
        Ok(())
    } else {
        Err(AuthError::Validation(format!(
            "password must be between {PASSWORD_MIN_CHARS} and {PASSWORD_MAX_CHARS} characters"
        )))
    }
}

/// Trimmed first and last name, both required and within column width.
pub(crate) fn validate_names(first_name: &str, last_name: &str) -> Result<(String, String), AuthError> {
    let first_name = first_name.trim();
    let last_name = last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AuthError::Validation(
            "first_name and last_name are required".to_string(),
        ));
    }
    check_max_chars("first_name", first_name, NAME_MAX_CHARS)?;
    check_max_chars("last_name", last_name, NAME_MAX_CHARS)?;
    Ok((first_name.to_string(), last_name.to_string()))
}

/// Compare a submitted code with the stored one in constant time.
pub(super) fn codes_match(expected: &str, submitted: &str) -> bool {
    expected
        .as_bytes()
        .ct_eq(submitted.trim().as_bytes())
        .into()
}

/// Six decimal digits from the OS RNG, zero padded.
pub(crate) fn generate_code() -> Result<String> {
    let mut bytes = [0u8; 4];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate verification code")?;
    Ok(format!("{:06}", u32::from_le_bytes(bytes) % 1_000_000))
}

/// Unwrap an optional JSON body; a missing or unparsable body is a 400.
pub(crate) fn require_payload<T>(payload: Option<Json<T>>) -> Result<T, AuthError> {
    payload
        .map(|Json(payload)| payload)
        .ok_or_else(|| AuthError::Validation("Missing payload".to_string()))
}

/// Token from an `Authorization: Bearer <token>` header.
pub(super) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn code_keys_are_namespaced_per_purpose() {
        assert_eq!(CodePurpose::Register.key("a@x.com"), "register_code_a@x.com");
        assert_eq!(
            CodePurpose::ForgotPassword.key("a@x.com"),
            "forgot_password_key_a@x.com"
        );
        assert_eq!(pending_key("a@x.com"), "user_a@x.com");
    }

    #[test]
    fn generated_codes_are_six_digits() -> Result<()> {
        for _ in 0..100 {
            let code = generate_code()?;
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
        Ok(())
    }

    #[test]
    fn password_length_bounds() {
        assert!(!valid_password("short"));
        assert!(valid_password("12345678"));
        assert!(valid_password(&"p".repeat(PASSWORD_MAX_CHARS)));
        assert!(!valid_password(&"p".repeat(PASSWORD_MAX_CHARS + 1)));
    }

    #[test]
    fn column_widths_are_enforced() {
        assert!(validate_names(&"a".repeat(NAME_MAX_CHARS), "b").is_ok());
        assert!(matches!(
            validate_names(&"a".repeat(NAME_MAX_CHARS + 1), "b"),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            validate_names("a", &"b".repeat(NAME_MAX_CHARS + 1)),
            Err(AuthError::Validation(_))
        ));

        let local = "a".repeat(EMAIL_MAX_CHARS - "@x.com".len());
        assert!(validate_email(&format!("{local}@x.com")).is_ok());
        assert!(matches!(
            validate_email(&format!("{local}a@x.com")),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn email_is_normalized_before_validation() -> Result<(), AuthError> {
        assert_eq!(validate_email("  Ada@Example.COM ")?, "ada@example.com");
        assert!(validate_email("not-an-email").is_err());
        Ok(())
    }

    #[test]
    fn code_comparison() {
        assert!(codes_match("012345", "012345"));
        assert!(codes_match("012345", " 012345\n"));
        assert!(!codes_match("012345", "012346"));
        assert!(!codes_match("012345", "01234"));
        assert!(!codes_match("012345", ""));
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  tok "));
        assert_eq!(extract_bearer(&headers), Some("tok"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer(&headers), None);
    }
}
