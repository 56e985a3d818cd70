use crate::api::{self, email::SmtpConfig, handlers::auth::AuthConfig, Backends};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub token_secret: SecretString,
    pub pending_ttl_seconds: u64,
    pub code_ttl_seconds: u64,
    pub access_token_ttl_seconds: u64,
    pub reset_token_ttl_seconds: u64,
    pub cors_origin: Option<String>,
    pub redis_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_pending_ttl_seconds(self.pending_ttl_seconds)
            .with_code_ttl_seconds(self.code_ttl_seconds)
            .with_access_token_ttl_seconds(self.access_token_ttl_seconds)
            .with_reset_token_ttl_seconds(self.reset_token_ttl_seconds)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, a backend cannot be built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = args.auth_config();
    debug!("Auth config: {:?}", auth_config);

    let backends = Backends {
        dsn: args.dsn,
        redis_url: args.redis_url,
        smtp: args.smtp,
        cors_origin: args.cors_origin,
    };

    api::new(args.port, auth_config, args.token_secret, backends).await
}
