//! Note model.
//!
//! A note belongs to exactly one workspace (immutable), optionally to a
//! folder, and may nest under a parent note. Notes carry an integer version
//! counting edit attempts (last write wins; no merge) and a list of outbound
//! references to other notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{CollaboratorSet, ResourceKind, SharedResource};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "snake_case")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub workspace_id: String,
    pub folder_id: Option<String>,
    pub parent_id: Option<String>,
    /// JSON array of short tag strings
    pub tags: Option<String>,
    pub is_public: bool,
    pub is_archived: bool,
    pub color: String,
    /// Edit-attempt counter. Starts at 1, incremented on every update.
    pub version: i64,
    /// JSON array of outbound reference spans
    pub refs: Option<String>,
    /// JSON array of collaborator grants
    pub collaborators: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(data: NoteCreate, author_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            title: data.title.trim().to_string(),
            content: data.content,
            author_id: author_id.to_string(),
            workspace_id: data.workspace_id,
            folder_id: data.folder_id,
            parent_id: data.parent_id,
            tags: to_json_list(&data.tags),
            is_public: data.is_public.unwrap_or(false),
            is_archived: false,
            color: data.color.unwrap_or_else(|| "#ffffff".to_string()),
            version: 1,
            refs: None,
            collaborators: None,
            last_activity: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Parse tags from the JSON column.
    pub fn tags_vec(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    /// Parse outbound references from the JSON column.
    pub fn references_vec(&self) -> Vec<NoteReference> {
        self.refs
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }
}

impl SharedResource for Note {
    fn owner_id(&self) -> &str {
        &self.author_id
    }

    fn is_public(&self) -> bool {
        self.is_public
    }

    fn collaborator_set(&self) -> CollaboratorSet {
        CollaboratorSet::from_json(self.collaborators.as_deref())
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Note
    }

    fn display_name(&self) -> &str {
        &self.title
    }
}

/// An inline link from one note to another: target note id plus the
/// character-offset span of the link in the source content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteReference {
    pub note_id: String,
    pub start: i64,
    pub end: i64,
}

/// Request model for creating a note.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NoteCreate {
    pub title: String,
    pub content: String,
    pub workspace_id: String,
    pub folder_id: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_public: Option<bool>,
    pub color: Option<String>,
}

/// Partial update for a note. Only set fields are applied; every successful
/// update increments the version regardless of whether anything changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub color: Option<String>,
    pub references: Option<Vec<NoteReference>>,
}

/// Serialize a string list for a JSON column; empty lists store as NULL.
pub(crate) fn to_json_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_string(items).ok()
    }
}
