//! Persisted user records.
//!
//! The auth workflow only needs lookup-by-email, create and password update;
//! the `/v1/users` routes use the remaining profile operations.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
pub(crate) mod memory;
mod postgres;

pub use self::postgres::PgUserStore;

pub const ROLE_USER: &str = "user";
pub const ROLE_SUPERADMIN: &str = "superadmin";
pub const ROLES: [&str; 2] = [ROLE_USER, ROLE_SUPERADMIN];

/// Canonical identity record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub email: String,
    pub gender: Option<String>,
    pub password_hash: String,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: String,
    pub created_at: String,
}

/// Fields needed to create a user; the password is already hashed.
///
/// Registration only fills the required fields. Pending registrations are
/// serialized into the code store, so the optional fields are skipped when
/// empty.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl NewUser {
    #[must_use]
    pub fn new(
        first_name: String,
        last_name: String,
        email: String,
        password_hash: String,
        role: &str,
    ) -> Self {
        Self {
            first_name,
            last_name,
            email,
            password_hash,
            role: role.to_string(),
            phone_number: None,
            gender: None,
            username: None,
            profile_image_url: None,
        }
    }

    /// Copy the optional profile fields; names in `profile` are ignored.
    #[must_use]
    pub fn with_profile(mut self, profile: ProfileUpdate) -> Self {
        self.phone_number = profile.phone_number;
        self.gender = profile.gender;
        self.username = profile.username;
        self.profile_image_url = profile.profile_image_url;
        self
    }
}

/// Replacement values for the editable profile fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(User),
    EmailTaken,
    UsernameTaken,
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(User),
    NotFound,
    /// Username already taken.
    Conflict,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<CreateOutcome>;

    async fn get(&self, id: Uuid) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<UpdateOutcome>;

    /// Returns `false` if no user has this id.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool>;

    /// Returns `false` if no user has this id.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Liveness check for `/health`.
    async fn ping(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_registration_payload_omits_empty_profile() -> anyhow::Result<()> {
        let user = NewUser::new(
            "Ada".to_string(),
            "Lovelace".to_string(),
            "ada@example.com".to_string(),
            "$argon2id$hash".to_string(),
            ROLE_USER,
        );
        let json = serde_json::to_string(&user)?;
        assert!(!json.contains("username"));

        let legacy = r#"{"first_name":"Ada","last_name":"Lovelace","email":"ada@example.com","password_hash":"h","role":"user"}"#;
        let decoded: NewUser = serde_json::from_str(legacy)?;
        assert_eq!(decoded.username, None);
        assert_eq!(decoded.role, ROLE_USER);
        Ok(())
    }
}
