use clap::{Arg, ArgMatches, Command};

pub const ARG_REDIS_URL: &str = "redis-url";

#[derive(Debug, Clone)]
pub struct Options {
    pub redis_url: Option<String>,
}

impl Options {
    /// Parse cache arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the Redis URL is not a `redis://` or `rediss://` URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let redis_url = matches
            .get_one::<String>(ARG_REDIS_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty());

        if let Some(url) = redis_url.as_deref() {
            let parsed = url::Url::parse(url)
                .map_err(|e| anyhow::anyhow!("invalid --{ARG_REDIS_URL}: {e}"))?;
            if !matches!(parsed.scheme(), "redis" | "rediss") {
                anyhow::bail!("--{ARG_REDIS_URL} must use the redis:// or rediss:// scheme");
            }
        }

        Ok(Self { redis_url })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_REDIS_URL)
            .long(ARG_REDIS_URL)
            .help("Redis URL for pending registrations and verification codes")
            .long_help(
                "Redis URL for pending registrations and verification codes.\n\nWhen unset, entries are kept in process memory and are lost on restart.",
            )
            .env("QUILL_REDIS_URL"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Options> {
        let command = with_args(Command::new("quill"));
        Options::parse(&command.get_matches_from(args))
    }

    #[test]
    fn redis_url_is_optional() -> anyhow::Result<()> {
        temp_env::with_vars([("QUILL_REDIS_URL", None::<&str>)], || {
            let options = parse(&["quill"])?;
            assert_eq!(options.redis_url, None);
            Ok(())
        })
    }

    #[test]
    fn redis_url_scheme_is_checked() -> anyhow::Result<()> {
        temp_env::with_vars([("QUILL_REDIS_URL", None::<&str>)], || {
            let options = parse(&["quill", "--redis-url", "redis://127.0.0.1:6379/0"])?;
            assert_eq!(
                options.redis_url.as_deref(),
                Some("redis://127.0.0.1:6379/0")
            );
            assert!(parse(&["quill", "--redis-url", "http://127.0.0.1:6379"]).is_err());
            Ok(())
        })
    }
}
