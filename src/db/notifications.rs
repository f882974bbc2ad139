//! Notification database queries.

use crate::models::{new_id, Notification, NotificationCreate, Page};
use crate::Result;
use chrono::Utc;
use sqlx::SqliteConnection;

use super::DbPool;

/// Insert a notification row.
pub async fn create_notification(
    pool: &DbPool,
    input: NotificationCreate,
) -> Result<Notification> {
    let metadata = if input.metadata.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&input.metadata)?)
    };

    let notification = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (id, recipient_id, sender_id, kind, message, note_id, is_read, metadata, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(&input.recipient_id)
    .bind(&input.sender_id)
    .bind(input.kind.as_str())
    .bind(&input.message)
    .bind(&input.note_id)
    .bind(metadata)
    .bind(Utc::now())
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(notification)
}

/// List notifications for a user, newest first, optionally unread only.
pub async fn list_notifications(
    pool: &DbPool,
    user_id: &str,
    page: i64,
    per_page: i64,
    unread_only: bool,
) -> Result<Page<Notification>> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let offset = (page - 1) * per_page;

    let read_clause = if unread_only { "AND is_read = 0" } else { "" };

    let items = sqlx::query_as::<_, Notification>(&format!(
        r#"
        SELECT * FROM notifications
        WHERE recipient_id = ? {read_clause}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#
    ))
    .bind(user_id)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? {read_clause}"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(Page::new(items, total, page, per_page))
}

/// Count unread notifications for a user.
pub async fn unread_count(pool: &DbPool, user_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND is_read = 0",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Mark specific notifications as read. Only rows addressed to `user_id`
/// are touched; returns the number of rows updated.
pub async fn mark_as_read(pool: &DbPool, user_id: &str, ids: &[String]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "UPDATE notifications SET is_read = 1, updated_at = ? WHERE recipient_id = ? AND id IN ({placeholders})"
    );

    let mut query = sqlx::query(&sql).bind(Utc::now()).bind(user_id);
    for id in ids {
        query = query.bind(id);
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Mark every notification for a user as read.
pub async fn mark_all_as_read(pool: &DbPool, user_id: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = 1, updated_at = ? WHERE recipient_id = ? AND is_read = 0",
    )
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete all notifications referencing a note. Runs inside the caller's
/// transaction so note deletion cascades atomically.
pub async fn delete_for_note(conn: &mut SqliteConnection, note_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM notifications WHERE note_id = ?")
        .bind(note_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
