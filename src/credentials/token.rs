//! HS256 bearer tokens.
//!
//! Tokens are self-contained: `base64url(header).base64url(claims).base64url(mac)`.
//! Nothing is stored server-side, so a token stays valid until `exp` even if
//! the account changes afterwards.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const ALG_HS256: &str = "HS256";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALG_HS256.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// What a token may be used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Issued by login and registration.
    Access,
    /// Issued by the forgot-password flow; only accepted when setting a new password.
    PasswordReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub purpose: TokenPurpose,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signing key")]
    Key,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

/// Signs and verifies bearer tokens with the process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: SecretString,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Key)
    }

    /// Issue a token for `user_id`/`email` that expires after `ttl`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded.
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        ttl: Duration,
        purpose: TokenPurpose,
    ) -> Result<String, TokenError> {
        self.issue_at(user_id, email, ttl, purpose, now_unix_seconds())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        ttl: Duration,
        purpose: TokenPurpose,
        now_unix_seconds: i64,
    ) -> Result<String, TokenError> {
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now_unix_seconds,
            exp: now_unix_seconds.saturating_add(ttl_seconds),
            purpose,
        };

        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify signature and expiry, returning the decoded claims.
    ///
    /// # Errors
    /// Returns `InvalidSignature` for tampered tokens, `Expired` once `exp` has
    /// passed, and format errors for anything that is not a token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, now_unix_seconds())
    }

    pub(crate) fn verify_at(&self, token: &str, now_unix_seconds: i64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != ALG_HS256 {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        // Constant-time comparison.
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if now_unix_seconds > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(SecretString::from(secret.to_string()))
    }

    #[test]
    fn issue_and_verify_round_trip() -> Result<(), TokenError> {
        let issuer = issuer("test-secret");
        let user_id = Uuid::new_v4();
        let token = issuer.issue_at(
            user_id,
            "a@x.com",
            Duration::from_secs(60),
            TokenPurpose::Access,
            NOW,
        )?;

        let claims = issuer.verify_at(&token, NOW + 30)?;
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + 60);
        assert_eq!(claims.purpose, TokenPurpose::Access);
        Ok(())
    }

    #[test]
    fn expiry_is_inclusive_of_exp_second() -> Result<(), TokenError> {
        let issuer = issuer("test-secret");
        let token = issuer.issue_at(
            Uuid::new_v4(),
            "a@x.com",
            Duration::from_secs(60),
            TokenPurpose::PasswordReset,
            NOW,
        )?;

        assert!(issuer.verify_at(&token, NOW + 60).is_ok());
        assert!(matches!(
            issuer.verify_at(&token, NOW + 61),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn rejects_other_secret() -> Result<(), TokenError> {
        let token = issuer("secret-one").issue_at(
            Uuid::new_v4(),
            "a@x.com",
            Duration::from_secs(60),
            TokenPurpose::Access,
            NOW,
        )?;
        assert!(matches!(
            issuer("secret-two").verify_at(&token, NOW),
            Err(TokenError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn rejects_tampered_claims() -> Result<(), TokenError> {
        let issuer = issuer("test-secret");
        let token = issuer.issue_at(
            Uuid::new_v4(),
            "a@x.com",
            Duration::from_secs(60),
            TokenPurpose::PasswordReset,
            NOW,
        )?;

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = b64e_json(&Claims {
            sub: Uuid::new_v4(),
            email: "mallory@x.com".to_string(),
            iat: NOW,
            exp: NOW + 60,
            purpose: TokenPurpose::Access,
        })?;
        parts[1] = &forged;
        let tampered = parts.join(".");

        assert!(matches!(
            issuer.verify_at(&tampered, NOW),
            Err(TokenError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn rejects_malformed_tokens() {
        let issuer = issuer("test-secret");
        assert!(matches!(
            issuer.verify_at("", NOW),
            Err(TokenError::TokenFormat | TokenError::Base64 | TokenError::Json(_))
        ));
        assert!(matches!(
            issuer.verify_at("a.b", NOW),
            Err(TokenError::TokenFormat)
        ));
        assert!(matches!(
            issuer.verify_at("a.b.c.d", NOW),
            Err(TokenError::TokenFormat)
        ));
        assert!(matches!(
            issuer.verify_at("!!.??.**", NOW),
            Err(TokenError::Base64)
        ));
    }

    #[test]
    fn rejects_unsupported_algorithm() -> Result<(), TokenError> {
        let header = b64e_json(&TokenHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        })?;
        let claims = b64e_json(&Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            iat: NOW,
            exp: NOW + 60,
            purpose: TokenPurpose::Access,
        })?;
        let token = format!("{header}.{claims}.");
        assert!(matches!(
            issuer("test-secret").verify_at(&token, NOW),
            Err(TokenError::UnsupportedAlg(alg)) if alg == "none"
        ));
        Ok(())
    }
}
