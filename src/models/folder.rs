//! Folder model. A folder belongs to exactly one workspace (immutable after
//! creation) and may nest under a parent folder in the same workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{CollaboratorSet, ResourceKind, SharedResource};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "snake_case")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub workspace_id: String,
    pub parent_id: Option<String>,
    pub owner_id: String,
    pub color: String,
    pub is_public: bool,
    /// JSON array of collaborator grants
    pub collaborators: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(data: FolderCreate, owner_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            name: data.name.trim().to_string(),
            description: data.description.map(|d| d.trim().to_string()),
            workspace_id: data.workspace_id,
            parent_id: data.parent_id,
            owner_id: owner_id.to_string(),
            color: data.color.unwrap_or_else(|| "#6366f1".to_string()),
            is_public: data.is_public.unwrap_or(false),
            collaborators: None,
            last_activity: now,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SharedResource for Folder {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn is_public(&self) -> bool {
        self.is_public
    }

    fn collaborator_set(&self) -> CollaboratorSet {
        CollaboratorSet::from_json(self.collaborators.as_deref())
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Folder
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// Request model for creating a folder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FolderCreate {
    pub name: String,
    pub description: Option<String>,
    pub workspace_id: String,
    pub parent_id: Option<String>,
    pub color: Option<String>,
    pub is_public: Option<bool>,
}

/// Partial update for a folder. Only set fields are applied; the owning
/// workspace cannot change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FolderUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_public: Option<bool>,
}
