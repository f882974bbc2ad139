//! User database queries.
//!
//! Email uniqueness is enforced by the schema; the unique-violation is
//! mapped to `AlreadyExists` so registration surfaces a 409-class error.

use crate::models::{normalize_email, User};
use crate::{Error, Result};
use chrono::Utc;

use super::DbPool;

/// Insert a new user. Fails with `AlreadyExists` when the email is taken.
pub async fn create_user(pool: &DbPool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, avatar_url, language, is_active, last_login, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.avatar_url)
    .bind(&user.language)
    .bind(user.is_active)
    .bind(user.last_login)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::AlreadyExists(format!("an account with email {} already exists", user.email))
        }
        _ => Error::Database(e),
    })?;

    Ok(())
}

/// Get a user by ID.
pub async fn get_user(pool: &DbPool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Find a user by email (normalized before lookup).
pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Find an active user by email. Used when resolving collaborator invites:
/// disabled accounts cannot be invited.
pub async fn find_active_by_email(pool: &DbPool, email: &str) -> Result<Option<User>> {
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? AND is_active = 1")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?;

    Ok(user)
}

/// Search active users by name or email fragment, excluding the caller.
pub async fn search_users(
    pool: &DbPool,
    query: &str,
    exclude_user_id: &str,
    limit: i64,
) -> Result<Vec<User>> {
    let pattern = format!("%{}%", query.to_lowercase());

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE is_active = 1
          AND id != ?
          AND (LOWER(name) LIKE ? OR email LIKE ?)
        ORDER BY name ASC
        LIMIT ?
        "#,
    )
    .bind(exclude_user_id)
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Update profile fields (name, avatar). Only set fields are applied.
pub async fn update_profile(
    pool: &DbPool,
    id: &str,
    name: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            avatar_url = COALESCE(?, avatar_url),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()))
    .bind(avatar_url)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Set the preferred language for a user.
pub async fn update_language(pool: &DbPool, id: &str, language: &str) -> Result<()> {
    sqlx::query("UPDATE users SET language = ?, updated_at = ? WHERE id = ?")
        .bind(language)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Record a successful login.
pub async fn update_last_login(pool: &DbPool, id: &str) -> Result<()> {
    sqlx::query("UPDATE users SET last_login = ?, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Soft-disable or re-enable an account. Users are never hard-deleted.
pub async fn set_active(pool: &DbPool, id: &str, active: bool) -> Result<()> {
    sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
