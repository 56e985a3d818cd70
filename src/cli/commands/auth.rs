use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_PENDING_TTL_SECONDS: &str = "pending-ttl-seconds";
pub const ARG_CODE_TTL_SECONDS: &str = "code-ttl-seconds";
pub const ARG_ACCESS_TOKEN_TTL_SECONDS: &str = "access-token-ttl-seconds";
pub const ARG_RESET_TOKEN_TTL_SECONDS: &str = "reset-token-ttl-seconds";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

/// HS256 keys shorter than the digest size are rejected.
const TOKEN_SECRET_MIN_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct Options {
    pub token_secret: SecretString,
    pub pending_ttl_seconds: u64,
    pub code_ttl_seconds: u64,
    pub access_token_ttl_seconds: u64,
    pub reset_token_ttl_seconds: u64,
    pub cors_origin: Option<String>,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the token secret is missing or too short, or a ttl is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let token_secret = match matches.get_one::<String>(ARG_TOKEN_SECRET) {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => anyhow::bail!("missing required argument: --{ARG_TOKEN_SECRET}"),
        };
        if token_secret.len() < TOKEN_SECRET_MIN_BYTES {
            anyhow::bail!("--{ARG_TOKEN_SECRET} must be at least {TOKEN_SECRET_MIN_BYTES} bytes");
        }

        let ttl = |id: &str| -> anyhow::Result<u64> {
            match matches.get_one::<u64>(id).copied() {
                Some(0) => anyhow::bail!("--{id} must be greater than zero"),
                Some(seconds) => Ok(seconds),
                None => anyhow::bail!("missing required argument: --{id}"),
            }
        };

        Ok(Self {
            token_secret: SecretString::from(token_secret),
            pending_ttl_seconds: ttl(ARG_PENDING_TTL_SECONDS)?,
            code_ttl_seconds: ttl(ARG_CODE_TTL_SECONDS)?,
            access_token_ttl_seconds: ttl(ARG_ACCESS_TOKEN_TTL_SECONDS)?,
            reset_token_ttl_seconds: ttl(ARG_RESET_TOKEN_TTL_SECONDS)?,
            cors_origin: matches
                .get_one::<String>(ARG_CORS_ORIGIN)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_ttl_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign bearer tokens (HS256)")
                .long_help(
                    "Secret used to sign bearer tokens (HS256).\n\nRotating it invalidates every token issued before the restart.",
                )
                .env("QUILL_TOKEN_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Frontend origin allowed by CORS (any origin when unset)")
                .env("QUILL_CORS_ORIGIN"),
        )
}

fn with_ttl_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PENDING_TTL_SECONDS)
                .long(ARG_PENDING_TTL_SECONDS)
                .help("Pending registration TTL in seconds")
                .env("QUILL_PENDING_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_CODE_TTL_SECONDS)
                .long(ARG_CODE_TTL_SECONDS)
                .help("Verification code TTL in seconds")
                .env("QUILL_CODE_TTL_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .long(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .help("Access token TTL in seconds")
                .env("QUILL_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("31104000")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL_SECONDS)
                .long(ARG_RESET_TOKEN_TTL_SECONDS)
                .help("Password reset token TTL in seconds")
                .env("QUILL_RESET_TOKEN_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn parse(args: &[&str]) -> anyhow::Result<Options> {
        let command = with_args(Command::new("quill"));
        Options::parse(&command.get_matches_from(args))
    }

    fn clean_env<R>(f: impl FnOnce() -> R) -> R {
        temp_env::with_vars(
            [
                ("QUILL_TOKEN_SECRET", None::<&str>),
                ("QUILL_CORS_ORIGIN", None),
                ("QUILL_PENDING_TTL_SECONDS", None),
                ("QUILL_CODE_TTL_SECONDS", None),
                ("QUILL_ACCESS_TOKEN_TTL_SECONDS", None),
                ("QUILL_RESET_TOKEN_TTL_SECONDS", None),
            ],
            f,
        )
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        clean_env(|| {
            let options = parse(&["quill", "--token-secret", SECRET])?;
            assert_eq!(options.token_secret.expose_secret(), SECRET);
            assert_eq!(options.pending_ttl_seconds, 600);
            assert_eq!(options.code_ttl_seconds, 60);
            assert_eq!(options.access_token_ttl_seconds, 360 * 24 * 60 * 60);
            assert_eq!(options.reset_token_ttl_seconds, 1800);
            assert_eq!(options.cors_origin, None);
            Ok(())
        })
    }

    #[test]
    fn token_secret_is_required() {
        clean_env(|| {
            let err = parse(&["quill"]).map(|_| ()).unwrap_err();
            assert!(err
                .to_string()
                .contains("missing required argument: --token-secret"));
            assert!(parse(&["quill", "--token-secret", "short"]).is_err());
        });
    }

    #[test]
    fn ttl_overrides_from_env() -> anyhow::Result<()> {
        clean_env(|| {
            temp_env::with_vars(
                [
                    ("QUILL_TOKEN_SECRET", Some(SECRET)),
                    ("QUILL_CODE_TTL_SECONDS", Some("120")),
                    ("QUILL_CORS_ORIGIN", Some("https://blog.example.com")),
                ],
                || {
                    let options = parse(&["quill"])?;
                    assert_eq!(options.code_ttl_seconds, 120);
                    assert_eq!(
                        options.cors_origin.as_deref(),
                        Some("https://blog.example.com")
                    );
                    Ok(())
                },
            )
        })
    }

    #[test]
    fn zero_ttl_is_rejected() {
        clean_env(|| {
            assert!(parse(&["quill", "--token-secret", SECRET, "--code-ttl-seconds", "0"]).is_err());
        });
    }
}
