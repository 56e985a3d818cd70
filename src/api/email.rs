//! Email delivery for verification codes.
//!
//! The auth workflow builds an `EmailMessage` and hands it to an
//! `EmailSender` from a detached task, so delivery never blocks a request.
//! `SmtpEmailSender` talks to a real relay; `LogEmailSender` only logs the
//! payload and is the default when no SMTP host is configured.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, Instrument};

pub const TEMPLATE_VERIFICATION: &str = "verification";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub template: String,
    pub payload_json: String,
}

impl EmailMessage {
    /// Message carrying a one-time verification code.
    #[must_use]
    pub fn verification_code(to_email: &str, code: &str) -> Self {
        Self {
            to_email: to_email.to_string(),
            subject: "Verification Email".to_string(),
            template: TEMPLATE_VERIFICATION.to_string(),
            payload_json: serde_json::json!({ "code": code }).to_string(),
        }
    }

    fn body(&self) -> String {
        let code = serde_json::from_str::<serde_json::Value>(&self.payload_json)
            .ok()
            .and_then(|payload| payload.get("code").and_then(|c| c.as_str().map(str::to_string)));
        match (self.template.as_str(), code) {
            (TEMPLATE_VERIFICATION, Some(code)) => format!(
                "Your verification code is {code}.\n\nIt expires in one minute. \
                 If you did not request it, ignore this email."
            ),
            _ => self.payload_json.clone(),
        }
    }
}

/// Email delivery abstraction used by the code dispatcher.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error; callers only log failures.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            payload = %message.payload_json,
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    from: String,
    starttls: bool,
}

impl SmtpConfig {
    /// Relay on port 587 with STARTTLS and no credentials.
    #[must_use]
    pub fn new(host: String, from: String) -> Self {
        Self {
            host,
            port: 587,
            username: None,
            password: None,
            from,
            starttls: true,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: String, password: SecretString) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    #[must_use]
    pub fn with_starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }
}

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// # Errors
    /// Returns an error if the relay host or the sender address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = (if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        })
        .with_context(|| format!("failed to create SMTP transport for {}", config.host))?;

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|err| anyhow!("invalid sender address {}: {err}", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message> {
        let to = message
            .to_email
            .parse::<Mailbox>()
            .map_err(|err| anyhow!("invalid recipient address {}: {err}", message.to_email))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body())
            .context("failed to build email message")
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = self.build_message(message)?;
        let span = tracing::info_span!(
            "email.send",
            email.template = %message.template,
            email.to = %message.to_email
        );
        self.transport
            .send(email)
            .instrument(span)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}
