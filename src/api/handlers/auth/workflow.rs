//! Registration, login and password-reset flows.
//!
//! Per email the account moves `Unregistered -> PendingVerification ->
//! Registered`, and `Registered -> PasswordResetRequested -> Registered`.
//! Pending registrations and codes live only in the `CodeStore` and vanish
//! with their ttl; nothing is promoted to Postgres without a matching code.

use anyhow::Context;
use tracing::{info, instrument};

use crate::credentials::TokenPurpose;
use crate::storage::{CreateOutcome, NewUser, User, ROLE_USER};

use super::error::AuthError;
use super::principal::Principal;
use super::state::AuthState;
use super::types::{AuthResponse, RegisterRequest};
use super::utils::{
    codes_match, normalize_email, pending_key, validate_email, validate_names, validate_password,
    CodePurpose,
};

impl AuthState {
    /// Park a hashed account under `user_<email>` and mail a registration code.
    ///
    /// Registering again before verification replaces the pending account,
    /// restarts its window and issues a new code; the old code stops matching.
    #[instrument(skip_all)]
    pub async fn register(&self, request: RegisterRequest) -> Result<(), AuthError> {
        let (first_name, last_name) = validate_names(&request.first_name, &request.last_name)?;
        let email = validate_email(&request.email)?;
        validate_password(&request.password)?;

        if self.users().get_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let pending = NewUser::new(
            first_name,
            last_name,
            email.clone(),
            self.hasher().hash(&request.password)?,
            ROLE_USER,
        );
        let payload =
            serde_json::to_string(&pending).context("failed to encode pending registration")?;
        self.codes()
            .set(&pending_key(&email), &payload, self.config().pending_ttl())
            .await?;

        self.dispatcher()
            .dispatch(CodePurpose::Register, &email, self.config().code_ttl());
        info!("Registration pending verification");
        Ok(())
    }

    /// Promote the pending account once the registration code matches.
    #[instrument(skip_all)]
    pub async fn verify(&self, email: &str, code: &str) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(email);
        let payload = self
            .codes()
            .get(&pending_key(&email))
            .await?
            .ok_or(AuthError::NotFound)?;
        let pending: NewUser =
            serde_json::from_str(&payload).context("failed to decode pending registration")?;

        self.check_code(CodePurpose::Register, &email, code).await?;

        let user = match self.users().create(pending).await? {
            CreateOutcome::Created(user) => user,
            CreateOutcome::EmailTaken => return Err(AuthError::EmailExists),
            CreateOutcome::UsernameTaken => return Err(AuthError::UsernameTaken),
        };
        info!(user_id = %user.id, "Registration verified");
        self.access_response(user)
    }

    /// Exchange email and password for an access token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(email);
        let user = self
            .users()
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::WrongEmailOrPassword)?;

        if !self.hasher().verify(password, &user.password_hash) {
            return Err(AuthError::WrongEmailOrPassword);
        }
        self.access_response(user)
    }

    /// Mail a reset code to a registered email.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if self.users().get_by_email(&email).await?.is_none() {
            return Err(AuthError::NotFound);
        }
        self.dispatcher()
            .dispatch(CodePurpose::ForgotPassword, &email, self.config().code_ttl());
        Ok(())
    }

    /// Exchange a reset code for a short-lived token that can set a new password.
    #[instrument(skip_all)]
    pub async fn verify_forgot_password(
        &self,
        email: &str,
        code: &str,
    ) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(email);
        self.check_code(CodePurpose::ForgotPassword, &email, code)
            .await?;

        let user = self
            .users()
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;
        let token = self.tokens().issue(
            user.id,
            &user.email,
            self.config().reset_token_ttl(),
            TokenPurpose::PasswordReset,
        )
        .context("failed to issue reset token")?;
        Ok(AuthResponse::new(user, token))
    }

    /// Replace the caller's password. Accepts access and reset tokens.
    #[instrument(skip_all, fields(user_id = %principal.user_id))]
    pub async fn update_password(
        &self,
        principal: &Principal,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let digest = self.hasher().hash(new_password)?;
        if !self
            .users()
            .update_password(principal.user_id, &digest)
            .await?
        {
            return Err(AuthError::NotFound);
        }
        info!("Password updated");
        Ok(())
    }

    async fn check_code(
        &self,
        purpose: CodePurpose,
        email: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        let expected = self
            .codes()
            .get(&purpose.key(email))
            .await?
            .ok_or(AuthError::CodeExpired)?;
        if !codes_match(&expected, code) {
            return Err(AuthError::IncorrectCode);
        }
        Ok(())
    }

    fn access_response(&self, user: User) -> Result<AuthResponse, AuthError> {
        let token = self.tokens().issue(
            user.id,
            &user.email,
            self.config().access_token_ttl(),
            TokenPurpose::Access,
        )
        .context("failed to issue access token")?;
        Ok(AuthResponse::new(user, token))
    }
}
