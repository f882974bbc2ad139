//! User service: registration and profile management.
//!
//! Credential verification and token issuance are the identity provider's
//! job; this service only manages the identity records the rest of the
//! core references by id.

use tracing::info;

use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use crate::models::User;

use super::NotificationService;

#[derive(Clone)]
pub struct UserService {
    db: DbPool,
    notifications: NotificationService,
}

impl UserService {
    pub fn new(db: DbPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    /// Register a new user. The email is case-normalized and must be
    /// unique; a duplicate surfaces as `AlreadyExists`. A welcome email is
    /// dispatched fire-and-forget.
    pub async fn register(&self, name: &str, email: &str) -> Result<User> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("name is required".to_string()));
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(Error::InvalidInput("a valid email is required".to_string()));
        }

        let user = User::new(name.to_string(), email.to_string());
        db::create_user(&self.db, &user).await?;

        info!(id = %user.id, email = %user.email, "Registered user");

        self.notifications.welcome(&user).await;

        Ok(user)
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        db::get_user(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        db::find_by_email(&self.db, email).await
    }

    /// Search active users by name or email fragment, excluding the caller.
    pub async fn search(&self, query: &str, current_user: &User, limit: i64) -> Result<Vec<User>> {
        db::search_users(&self.db, query, &current_user.id, limit).await
    }

    /// Update the caller's profile. Only set fields are applied.
    pub async fn update_profile(
        &self,
        user: &User,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<User> {
        db::update_profile(&self.db, &user.id, name, avatar_url).await?;
        self.get(&user.id).await
    }

    pub async fn update_language(&self, user: &User, language: &str) -> Result<User> {
        db::update_language(&self.db, &user.id, language).await?;
        self.get(&user.id).await
    }

    pub async fn record_login(&self, user: &User) -> Result<()> {
        db::update_last_login(&self.db, &user.id).await
    }

    /// Soft-disable an account. Its grants and owned resources remain;
    /// the user simply can no longer be resolved as an active invitee.
    pub async fn deactivate(&self, user: &User) -> Result<()> {
        db::set_active(&self.db, &user.id, false).await?;
        info!(id = %user.id, "Deactivated user");
        Ok(())
    }

    pub async fn reactivate(&self, user: &User) -> Result<()> {
        db::set_active(&self.db, &user.id, true).await
    }
}
