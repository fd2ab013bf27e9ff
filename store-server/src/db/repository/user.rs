//! User Repository

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::User;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const USER_TABLE: &str = "user";

#[derive(Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user: Option<User> = self
            .base
            .db()
            .query("SELECT * FROM user WHERE username = $username LIMIT 1")
            .bind(("username", username.to_string()))
            .await?
            .take(0)?;
        Ok(user)
    }

    /// Whether a user with this username or email already exists
    pub async fn username_or_email_taken(&self, username: &str, email: &str) -> RepoResult<bool> {
        let existing: Vec<User> = self
            .base
            .db()
            .query("SELECT * FROM user WHERE username = $username OR email = $email")
            .bind(("username", username.to_string()))
            .bind(("email", email.to_string()))
            .await?
            .take(0)?;
        Ok(!existing.is_empty())
    }

    /// Find a user by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let user: Option<User> = self.base.db().select(record_id(USER_TABLE, id)).await?;
        Ok(user)
    }

    /// Create a new user
    pub async fn create(&self, user: User) -> RepoResult<User> {
        let created: Option<User> = self.base.db().create(USER_TABLE).content(user).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create user".to_string()))
    }
}
