use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{CreateOutcome, NewUser, ProfileUpdate, UpdateOutcome, User, UserStore};

macro_rules! user_columns {
    () => {
        r#"id, first_name, last_name, phone_number, email, gender, password, username,
           profile_image_url, role,
           to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at"#
    };
}

/// Name of the violated unique constraint when `err` is SQLSTATE 23505.
fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().is_some_and(|code| code.as_ref() == "23505") => {
            Some(db_err.constraint().unwrap_or_default())
        }
        _ => None,
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone_number: row.get("phone_number"),
        email: row.get("email"),
        gender: row.get("gender"),
        password_hash: row.get("password"),
        username: row.get("username"),
        profile_image_url: row.get("profile_image_url"),
        role: row.get("role"),
        created_at: row.get("created_at"),
    }
}

/// `UserStore` over the `users` table.
#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<CreateOutcome> {
        let query = concat!(
            "INSERT INTO users (first_name, last_name, email, password, role, ",
            "phone_number, gender, username, profile_image_url) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING ",
            user_columns!()
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(&user.phone_number)
            .bind(&user.gender)
            .bind(&user.username)
            .bind(&user.profile_image_url)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(user_from_row(&row))),
            Err(err) => match unique_violation(&err) {
                Some(constraint) if constraint.contains("username") => {
                    Ok(CreateOutcome::UsernameTaken)
                }
                Some(_) => Ok(CreateOutcome::EmailTaken),
                None => Err(err).context("failed to insert user"),
            },
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        let query = concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = concat!("SELECT ", user_columns!(), " FROM users WHERE email = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<UpdateOutcome> {
        let query = concat!(
            "UPDATE users SET first_name = $2, last_name = $3, phone_number = $4, ",
            "gender = $5, username = $6, profile_image_url = $7 ",
            "WHERE id = $1 RETURNING ",
            user_columns!()
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.phone_number)
            .bind(&update.gender)
            .bind(&update.username)
            .bind(&update.profile_image_url)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(Some(row)) => Ok(UpdateOutcome::Updated(user_from_row(&row))),
            Ok(None) => Ok(UpdateOutcome::NotFound),
            Err(err) if unique_violation(&err).is_some() => Ok(UpdateOutcome::Conflict),
            Err(err) => Err(err).context("failed to update user profile"),
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let query = "UPDATE users SET password = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update password")?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let query = "DELETE FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete user")?;

        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<()> {
        let query = "SELECT 1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError, fmt};

    #[derive(Debug)]
    struct FakeDbError {
        code: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &'static str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }
    }

    fn db_error(code: Option<&'static str>, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError { code, constraint }))
    }

    #[test]
    fn unique_violation_is_detected_by_sqlstate() {
        assert_eq!(
            unique_violation(&db_error(Some("23505"), Some("users_email_key"))),
            Some("users_email_key")
        );
        assert_eq!(
            unique_violation(&db_error(Some("23505"), Some("users_username_key"))),
            Some("users_username_key")
        );
        assert_eq!(unique_violation(&db_error(Some("23505"), None)), Some(""));

        // value too long and check violations are not conflicts
        assert_eq!(unique_violation(&db_error(Some("22001"), None)), None);
        assert_eq!(unique_violation(&db_error(Some("23514"), None)), None);
        assert_eq!(unique_violation(&db_error(None, None)), None);
        assert_eq!(unique_violation(&sqlx::Error::RowNotFound), None);
    }

    #[test]
    fn select_statements_format_created_at_as_rfc3339() {
        let columns = user_columns!();
        assert!(columns.contains("AS created_at"));
        assert!(columns.contains(r#"'YYYY-MM-DD"T"HH24:MI:SS"Z"'"#));
    }
}
