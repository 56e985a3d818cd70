//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an action, such as starting the API server
//! with its backends and auth configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, cache, smtp, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};
use secrecy::SecretString;
use url::Url;

fn validate_dsn(dsn: &str) -> Result<()> {
    let parsed = Url::parse(dsn).context("invalid --dsn")?;
    if !matches!(parsed.scheme(), "postgres" | "postgresql") {
        anyhow::bail!("--dsn must use the postgres:// or postgresql:// scheme");
    }
    if parsed.host_str().is_none() {
        anyhow::bail!("--dsn must include a host");
    }
    Ok(())
}

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    validate_dsn(&dsn)?;

    let auth_opts = auth::Options::parse(matches)?;
    let cache_opts = cache::Options::parse(matches)?;
    let smtp_opts = smtp::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn: SecretString::from(dsn),
        token_secret: auth_opts.token_secret,
        pending_ttl_seconds: auth_opts.pending_ttl_seconds,
        code_ttl_seconds: auth_opts.code_ttl_seconds,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        cors_origin: auth_opts.cors_origin,
        redis_url: cache_opts.redis_url,
        smtp: smtp_opts.smtp,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn env<'a>(
        dsn: Option<&'a str>,
        secret: Option<&'a str>,
    ) -> [(&'static str, Option<&'a str>); 5] {
        [
            ("QUILL_DSN", dsn),
            ("QUILL_TOKEN_SECRET", secret),
            ("QUILL_REDIS_URL", None),
            ("QUILL_SMTP_HOST", None),
            ("QUILL_PORT", None),
        ]
    }

    #[test]
    fn builds_server_action() {
        temp_env::with_vars(
            env(Some("postgres://quill@localhost:5432/quill"), Some(SECRET)),
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["quill"]);
                match handler(&matches) {
                    Ok(Action::Server(args)) => {
                        assert_eq!(args.port, 8080);
                        assert_eq!(args.code_ttl_seconds, 60);
                        assert!(args.redis_url.is_none());
                        assert!(args.smtp.is_none());
                    }
                    Err(err) => panic!("unexpected error: {err:#}"),
                }
            },
        );
    }

    #[test]
    fn token_secret_required() {
        temp_env::with_vars(
            env(Some("postgres://quill@localhost:5432/quill"), None),
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["quill"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --token-secret"));
                }
            },
        );
    }

    #[test]
    fn dsn_must_be_postgres_url() {
        assert!(validate_dsn("postgres://quill@localhost:5432/quill").is_ok());
        assert!(validate_dsn("postgresql://localhost/quill").is_ok());
        assert!(validate_dsn("mysql://localhost/quill").is_err());
        assert!(validate_dsn("not a dsn").is_err());
    }
}
