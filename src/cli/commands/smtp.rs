use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::email::SmtpConfig;

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_SMTP_FROM: &str = "smtp-from";
pub const ARG_SMTP_STARTTLS: &str = "smtp-starttls";

#[derive(Debug, Clone)]
pub struct Options {
    pub smtp: Option<SmtpConfig>,
}

impl Options {
    /// Parse SMTP arguments from matches. No host means emails are only logged.
    ///
    /// # Errors
    /// Returns an error if only one of username and password is set.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(host) = get_non_empty(ARG_SMTP_HOST) else {
            return Ok(Self { smtp: None });
        };

        let from = get_non_empty(ARG_SMTP_FROM)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_SMTP_FROM}"))?;

        let mut config = SmtpConfig::new(host, from)
            .with_port(matches.get_one::<u16>(ARG_SMTP_PORT).copied().unwrap_or(587))
            .with_starttls(
                matches
                    .get_one::<bool>(ARG_SMTP_STARTTLS)
                    .copied()
                    .unwrap_or(true),
            );

        match (
            get_non_empty(ARG_SMTP_USERNAME),
            get_non_empty(ARG_SMTP_PASSWORD),
        ) {
            (Some(username), Some(password)) => {
                config = config.with_credentials(username, SecretString::from(password));
            }
            (None, None) => {}
            _ => anyhow::bail!(
                "--{ARG_SMTP_USERNAME} and --{ARG_SMTP_PASSWORD} must be set together"
            ),
        }

        Ok(Self {
            smtp: Some(config),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host (emails are only logged when unset)")
                .env("QUILL_SMTP_HOST"),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port")
                .env("QUILL_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("QUILL_SMTP_USERNAME"),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("QUILL_SMTP_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SMTP_FROM)
                .long(ARG_SMTP_FROM)
                .help("Sender address for outgoing emails")
                .env("QUILL_SMTP_FROM")
                .default_value("Quill <no-reply@quill.dev>"),
        )
        .arg(
            Arg::new(ARG_SMTP_STARTTLS)
                .long(ARG_SMTP_STARTTLS)
                .help("Use STARTTLS instead of implicit TLS")
                .env("QUILL_SMTP_STARTTLS")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
}
