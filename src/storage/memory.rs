//! `UserStore` kept in a map, for handler and workflow tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CreateOutcome, NewUser, ProfileUpdate, UpdateOutcome, User, UserStore};

#[derive(Default)]
pub(crate) struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed user, bypassing the registration flow.
    pub(crate) async fn insert(&self, user: User) {
        self.users.lock().await.insert(user.id, user);
    }

    pub(crate) async fn len(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<CreateOutcome> {
        let mut users = self.users.lock().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Ok(CreateOutcome::EmailTaken);
        }
        if let Some(username) = user.username.as_deref() {
            if users
                .values()
                .any(|existing| existing.username.as_deref() == Some(username))
            {
                return Ok(CreateOutcome::UsernameTaken);
            }
        }
        let created = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            email: user.email,
            gender: user.gender,
            password_hash: user.password_hash,
            username: user.username,
            profile_image_url: user.profile_image_url,
            role: user.role,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        users.insert(created.id, created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<UpdateOutcome> {
        let mut users = self.users.lock().await;
        if let Some(username) = update.username.as_deref() {
            let taken = users
                .values()
                .any(|user| user.id != id && user.username.as_deref() == Some(username));
            if taken {
                return Ok(UpdateOutcome::Conflict);
            }
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        user.first_name = update.first_name;
        user.last_name = update.last_name;
        user.phone_number = update.phone_number;
        user.gender = update.gender;
        user.username = update.username;
        user.profile_image_url = update.profile_image_url;
        Ok(UpdateOutcome::Updated(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let mut users = self.users.lock().await;
        Ok(users
            .get_mut(&id)
            .map(|user| user.password_hash = password_hash.to_string())
            .is_some())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.users.lock().await.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
