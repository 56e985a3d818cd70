//! Auth state and configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::api::email::EmailSender;
use crate::cache::CodeStore;
use crate::credentials::{PasswordHasher, TokenIssuer};
use crate::storage::UserStore;

use super::dispatch::CodeDispatcher;

const DEFAULT_PENDING_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_CODE_TTL_SECONDS: u64 = 60;
const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: u64 = 360 * 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: u64 = 30 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    pending_ttl: Duration,
    code_ttl: Duration,
    access_token_ttl: Duration,
    reset_token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    /// Pending registrations live 10 minutes, codes 1 minute, access tokens
    /// 360 days and reset tokens 30 minutes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending_ttl: Duration::from_secs(DEFAULT_PENDING_TTL_SECONDS),
            code_ttl: Duration::from_secs(DEFAULT_CODE_TTL_SECONDS),
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
            reset_token_ttl: Duration::from_secs(DEFAULT_RESET_TOKEN_TTL_SECONDS),
        }
    }

    #[must_use]
    pub fn with_pending_ttl_seconds(mut self, seconds: u64) -> Self {
        self.pending_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_code_ttl_seconds(mut self, seconds: u64) -> Self {
        self.code_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.access_token_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.reset_token_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn pending_ttl(&self) -> Duration {
        self.pending_ttl
    }

    #[must_use]
    pub fn code_ttl(&self) -> Duration {
        self.code_ttl
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    #[must_use]
    pub fn reset_token_ttl(&self) -> Duration {
        self.reset_token_ttl
    }
}

/// Everything the auth and user handlers need, shared behind an `Arc`.
pub struct AuthState {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    codes: Arc<dyn CodeStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    dispatcher: CodeDispatcher,
}

impl AuthState {
    /// Must be called from within a tokio runtime; see [`CodeDispatcher::new`].
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        codes: Arc<dyn CodeStore>,
        tokens: TokenIssuer,
        emails: Arc<dyn EmailSender>,
    ) -> Self {
        let dispatcher = CodeDispatcher::new(Arc::clone(&codes), emails);
        Self {
            config,
            users,
            codes,
            hasher: PasswordHasher::default(),
            tokens,
            dispatcher,
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub(crate) fn codes(&self) -> &dyn CodeStore {
        self.codes.as_ref()
    }

    pub(crate) fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub(crate) fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub(super) fn dispatcher(&self) -> &CodeDispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AuthConfig::new();
        assert_eq!(config.pending_ttl(), Duration::from_secs(600));
        assert_eq!(config.code_ttl(), Duration::from_secs(60));
        assert_eq!(config.access_token_ttl(), Duration::from_secs(31_104_000));
        assert_eq!(config.reset_token_ttl(), Duration::from_secs(1800));
    }

    #[test]
    fn config_overrides() {
        let config = AuthConfig::new()
            .with_pending_ttl_seconds(5)
            .with_code_ttl_seconds(2)
            .with_access_token_ttl_seconds(3)
            .with_reset_token_ttl_seconds(4);
        assert_eq!(config.pending_ttl(), Duration::from_secs(5));
        assert_eq!(config.code_ttl(), Duration::from_secs(2));
        assert_eq!(config.access_token_ttl(), Duration::from_secs(3));
        assert_eq!(config.reset_token_ttl(), Duration::from_secs(4));
    }
}
