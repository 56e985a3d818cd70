//! Detached verification-code delivery.
//!
//! Each dispatch is its own tokio task: generate a code, store it under the
//! purpose key with the code ttl, then mail it. The request that triggered it
//! never waits. Failures are sent to an unbounded channel drained by a single
//! logger task, so a broken SMTP relay shows up in logs and nowhere else.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info_span, Instrument};

use crate::api::email::{EmailMessage, EmailSender};
use crate::cache::CodeStore;

use super::utils::{generate_code, CodePurpose};

#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("failed to generate {purpose} code: {cause:#}")]
    Generate {
        purpose: &'static str,
        cause: anyhow::Error,
    },
    #[error("failed to store {purpose} code for {email}: {cause:#}")]
    Store {
        purpose: &'static str,
        email: String,
        cause: anyhow::Error,
    },
    #[error("failed to deliver {purpose} code to {email}: {cause:#}")]
    Delivery {
        purpose: &'static str,
        email: String,
        cause: anyhow::Error,
    },
}

#[derive(Clone)]
pub struct CodeDispatcher {
    codes: Arc<dyn CodeStore>,
    emails: Arc<dyn EmailSender>,
    errors: mpsc::UnboundedSender<DispatchError>,
}

impl std::fmt::Debug for CodeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeDispatcher").finish_non_exhaustive()
    }
}

impl CodeDispatcher {
    /// Build a dispatcher and spawn its error logger.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(codes: Arc<dyn CodeStore>, emails: Arc<dyn EmailSender>) -> Self {
        let (errors, mut rx) = mpsc::unbounded_channel::<DispatchError>();
        tokio::spawn(async move {
            while let Some(err) = rx.recv().await {
                error!("Verification code dispatch failed: {err}");
            }
        });
        Self {
            codes,
            emails,
            errors,
        }
    }

    /// Spawn the code job for `email` and return immediately.
    pub(crate) fn dispatch(&self, purpose: CodePurpose, email: &str, ttl: Duration) {
        let codes = Arc::clone(&self.codes);
        let emails = Arc::clone(&self.emails);
        let errors = self.errors.clone();
        let email = email.to_string();
        let span = info_span!("auth.dispatch_code", purpose = purpose.as_str());

        tokio::spawn(
            async move {
                if let Err(err) = deliver(codes.as_ref(), emails.as_ref(), purpose, &email, ttl).await
                {
                    // The logger only goes away at shutdown.
                    let _ = errors.send(err);
                }
            }
            .instrument(span),
        );
    }
}

async fn deliver(
    codes: &dyn CodeStore,
    emails: &dyn EmailSender,
    purpose: CodePurpose,
    email: &str,
    ttl: Duration,
) -> Result<(), DispatchError> {
    let code = generate_code().map_err(|cause| DispatchError::Generate {
        purpose: purpose.as_str(),
        cause,
    })?;

    codes
        .set(&purpose.key(email), &code, ttl)
        .await
        .map_err(|cause| DispatchError::Store {
            purpose: purpose.as_str(),
            email: email.to_string(),
            cause,
        })?;

    emails
        .send(&EmailMessage::verification_code(email, &code))
        .await
        .map_err(|cause| DispatchError::Delivery {
            purpose: purpose.as_str(),
            email: email.to_string(),
            cause,
        })?;

    debug!("Verification code sent");
    Ok(())
}
