//! Workspace model: the top-level container for folders and notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{CollaboratorSet, ResourceKind, SharedResource};

/// A workspace. May nest under a parent workspace; folders and notes
/// reference it by id only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "snake_case")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub parent_id: Option<String>,
    pub color: String,
    pub is_public: bool,
    /// JSON array of collaborator grants
    pub collaborators: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(data: WorkspaceCreate, owner_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            name: data.name.trim().to_string(),
            description: data.description.map(|d| d.trim().to_string()),
            owner_id: owner_id.to_string(),
            parent_id: data.parent_id,
            color: data.color.unwrap_or_else(|| "#6366f1".to_string()),
            is_public: data.is_public.unwrap_or(false),
            collaborators: None,
            last_activity: now,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SharedResource for Workspace {
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
        ResourceKind::Workspace
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// Request model for creating a workspace.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkspaceCreate {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub color: Option<String>,
    pub is_public: Option<bool>,
}

/// Partial update for a workspace. Only set fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_public: Option<bool>,
}
