//! Collaborator and permission types shared by all resource kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Graded permission level for a collaborator.
///
/// Total ordering: `Read < Write < Admin`. A higher level implies every
/// lower one, which is what [`Permission::satisfies`] encodes. The resource
/// owner holds implicit admin and never appears in a collaborator list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    #[default]
    Read,
    Write,
    Admin,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" => Some(Permission::Read),
            "write" => Some(Permission::Write),
            "admin" => Some(Permission::Admin),
            _ => None,
        }
    }

    /// Check whether this level grants the `required` one.
    pub fn satisfies(&self, required: Permission) -> bool {
        *self >= required
    }
}

/// A single grant: (user, permission, when it was granted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub user_id: String,
    pub permission: Permission,
    pub granted_at: DateTime<Utc>,
}

/// Per-resource collaborator collection, keyed by user id.
///
/// Owned value collection serialized into the resource row's JSON
/// `collaborators` column. Invariants: at most one entry per user, and the
/// resource owner is never a member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollaboratorSet {
    entries: Vec<Collaborator>,
}

impl CollaboratorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from the JSON column value. Absent or malformed JSON yields an
    /// empty set.
    pub fn from_json(json: Option<&str>) -> Self {
        json.and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    /// Serialize for storage in the JSON column. `None` when empty, matching
    /// how empty embedded lists are stored elsewhere.
    pub fn to_json(&self) -> Option<String> {
        if self.entries.is_empty() {
            None
        } else {
            serde_json::to_string(&self.entries).ok()
        }
    }

    /// Grant `permission` to `user_id` on a resource owned by `owner_id`.
    ///
    /// Upsert semantics: an existing grant is replaced and its timestamp
    /// refreshed, so changing a collaborator's permission is a single call.
    /// The only failure is attempting to add the owner.
    pub fn grant(&mut self, owner_id: &str, user_id: &str, permission: Permission) -> Result<()> {
        if user_id == owner_id {
            return Err(Error::InvalidOperation(
                "the owner cannot be added as a collaborator".to_string(),
            ));
        }

        self.entries.retain(|c| c.user_id != user_id);
        self.entries.push(Collaborator {
            user_id: user_id.to_string(),
            permission,
            granted_at: Utc::now(),
        });

        Ok(())
    }

    /// Remove a collaborator. Idempotent: removing an absent user is a no-op.
    pub fn remove(&mut self, user_id: &str) {
        self.entries.retain(|c| c.user_id != user_id);
    }

    /// Look up the permission granted to a user, if any.
    pub fn permission_of(&self, user_id: &str) -> Option<Permission> {
        self.entries
            .iter()
            .find(|c| c.user_id == user_id)
            .map(|c| c.permission)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.iter().any(|c| c.user_id == user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collaborator> {
        self.entries.iter()
    }
}
