//! Notification model, created as a side effect of sharing and
//! content-modification events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ShareInvitation,
    ContentModified,
    Comment,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ShareInvitation => "share_invitation",
            NotificationKind::ContentModified => "content_modified",
            NotificationKind::Comment => "comment",
            NotificationKind::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "share_invitation" => Some(NotificationKind::ShareInvitation),
            "content_modified" => Some(NotificationKind::ContentModified),
            "comment" => Some(NotificationKind::Comment),
            "system" => Some(NotificationKind::System),
            _ => None,
        }
    }
}

/// A notification row addressed to a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "snake_case")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub sender_id: Option<String>,
    pub kind: String,
    pub message: String,
    pub note_id: Option<String>,
    pub is_read: bool,
    /// JSON object of free-form string metadata
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn kind_enum(&self) -> Option<NotificationKind> {
        NotificationKind::from_str(&self.kind)
    }

    /// Parse metadata from the JSON column.
    pub fn metadata_map(&self) -> HashMap<String, String> {
        self.metadata
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }
}

/// Input for creating a notification.
#[derive(Debug, Clone)]
pub struct NotificationCreate {
    pub recipient_id: String,
    pub sender_id: Option<String>,
    pub kind: NotificationKind,
    pub message: String,
    pub note_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl NotificationCreate {
    pub fn new(recipient_id: &str, kind: NotificationKind, message: String) -> Self {
        Self {
            recipient_id: recipient_id.to_string(),
            sender_id: None,
            kind,
            message,
            note_id: None,
            metadata: HashMap::new(),
        }
    }
}
