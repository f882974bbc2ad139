//! Workspace service.
//!
//! Orchestrates create/read/update/delete/share for workspaces: permission
//! checks via [`PermissionPolicy`], containment checks via
//! [`HierarchyGuard`], sharing via the collaborator set, and invitation
//! notifications as fire-and-forget side effects. Every mutation re-loads
//! and re-checks inside its own transaction.

use chrono::Utc;
use tracing::{debug, info};

use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use crate::models::{
    Permission, SharedResource, User, Workspace, WorkspaceCreate, WorkspaceUpdate,
};

use super::hierarchy::HierarchyGuard;
use super::permissions::{Access, AccessibleSetFilter, PermissionPolicy};
use super::NotificationService;

#[derive(Clone)]
pub struct WorkspaceService {
    db: DbPool,
    notifications: NotificationService,
}

impl WorkspaceService {
    pub fn new(db: DbPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    /// Create a workspace. A parent workspace, when given, must exist and
    /// the creator needs write access on it.
    pub async fn create(&self, user: &User, data: WorkspaceCreate) -> Result<Workspace> {
        if data.name.trim().is_empty() {
            return Err(Error::InvalidInput("workspace name is required".to_string()));
        }

        let mut tx = self.db.begin().await?;

        if let Some(parent_id) = &data.parent_id {
            let parent = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::NotFound(format!("parent workspace {parent_id}")))?;

            if !PermissionPolicy::resolve(&parent, user).can_write {
                return Err(Error::Forbidden(
                    "write access to the parent workspace is required".to_string(),
                ));
            }
        }

        let workspace = Workspace::new(data, &user.id);

        sqlx::query(
            r#"
            INSERT INTO workspaces (id, name, description, owner_id, parent_id, color, is_public, collaborators, last_activity, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.description)
        .bind(&workspace.owner_id)
        .bind(&workspace.parent_id)
        .bind(&workspace.color)
        .bind(workspace.is_public)
        .bind(&workspace.collaborators)
        .bind(workspace.last_activity)
        .bind(workspace.created_at)
        .bind(workspace.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %workspace.id, owner = %user.id, "Created workspace");

        Ok(workspace)
    }

    /// Get a workspace the user can read.
    pub async fn get(&self, id: &str, user: &User) -> Result<Workspace> {
        let workspace = self.find(id).await?;

        if !PermissionPolicy::resolve(&workspace, user).can_read {
            return Err(Error::Forbidden(format!(
                "read access denied on workspace {id}"
            )));
        }

        Ok(workspace)
    }

    /// List workspaces visible to the user. With `include_public` false the
    /// result is restricted to owned-or-shared workspaces.
    pub async fn list_for_user(&self, user: &User, include_public: bool) -> Result<Vec<Workspace>> {
        let predicate = if include_public {
            AccessibleSetFilter::predicate_sql("owner_id")
        } else {
            "(owner_id = ? \
             OR EXISTS (SELECT 1 FROM json_each(COALESCE(collaborators, '[]')) \
                        WHERE json_extract(json_each.value, '$.user_id') = ?))"
                .to_string()
        };

        let sql =
            format!("SELECT * FROM workspaces WHERE {predicate} ORDER BY last_activity DESC");

        let workspaces = sqlx::query_as::<_, Workspace>(&sql)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(workspaces)
    }

    /// Search accessible workspaces by name or description.
    pub async fn search(&self, user: &User, query: &str) -> Result<Vec<Workspace>> {
        let sql = format!(
            "SELECT * FROM workspaces WHERE {} \
             AND (LOWER(name) LIKE ? OR LOWER(COALESCE(description, '')) LIKE ?) \
             ORDER BY last_activity DESC",
            AccessibleSetFilter::predicate_sql("owner_id")
        );
        let pattern = format!("%{}%", query.to_lowercase());

        let workspaces = sqlx::query_as::<_, Workspace>(&sql)
            .bind(&user.id)
            .bind(&user.id)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.db)
            .await?;

        Ok(workspaces)
    }

    /// Accessible root workspaces (no parent).
    pub async fn hierarchy(&self, user: &User) -> Result<Vec<Workspace>> {
        let sql = format!(
            "SELECT * FROM workspaces WHERE parent_id IS NULL AND {} ORDER BY name ASC",
            AccessibleSetFilter::predicate_sql("owner_id")
        );

        let workspaces = sqlx::query_as::<_, Workspace>(&sql)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(workspaces)
    }

    /// Accessible children of a workspace, looked up by containing id.
    pub async fn children(&self, parent_id: &str, user: &User) -> Result<Vec<Workspace>> {
        let sql = format!(
            "SELECT * FROM workspaces WHERE parent_id = ? AND {} ORDER BY name ASC",
            AccessibleSetFilter::predicate_sql("owner_id")
        );

        let workspaces = sqlx::query_as::<_, Workspace>(&sql)
            .bind(parent_id)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(workspaces)
    }

    /// Partial update. Requires write access; refreshes last activity.
    pub async fn update(&self, id: &str, user: &User, data: WorkspaceUpdate) -> Result<Workspace> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("workspace {id}")))?;

        if !PermissionPolicy::resolve(&existing, user).can_write {
            return Err(Error::Forbidden(format!(
                "write access denied on workspace {id}"
            )));
        }

        let name = match data.name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => existing.name,
        };
        let description = data
            .description
            .map(|d| d.trim().to_string())
            .or(existing.description);
        let color = data.color.unwrap_or(existing.color);
        let is_public = data.is_public.unwrap_or(existing.is_public);
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE workspaces
            SET name = ?, description = ?, color = ?, is_public = ?, last_activity = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&name)
        .bind(&description)
        .bind(&color)
        .bind(is_public)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(id = %id, "Updated workspace");

        Ok(Workspace {
            name,
            description,
            color,
            is_public,
            last_activity: now,
            updated_at: now,
            ..existing
        })
    }

    /// Delete a workspace. Requires admin access; blocked while any
    /// sub-workspace, folder or note still references it.
    pub async fn delete(&self, id: &str, user: &User) -> Result<()> {
        let mut tx = self.db.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("workspace {id}")))?;

        if !PermissionPolicy::resolve(&workspace, user).can_admin {
            return Err(Error::Forbidden(format!(
                "admin access denied on workspace {id}"
            )));
        }

        if let Some(block) = HierarchyGuard::workspace_delete_block(&mut *tx, id).await? {
            return Err(Error::Conflict(format!(
                "cannot delete workspace: {}",
                block.reason()
            )));
        }

        sqlx::query("DELETE FROM workspaces WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Deleted workspace");

        Ok(())
    }

    /// Share the workspace with a user resolved by email. Requires admin
    /// access. Re-inviting replaces the existing grant. The invitation
    /// notification is fire-and-forget after commit.
    pub async fn add_collaborator(
        &self,
        id: &str,
        user: &User,
        email: &str,
        permission: Permission,
    ) -> Result<Workspace> {
        let target = db::find_active_by_email(&self.db, email)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no active user with email {email}")))?;

        let mut tx = self.db.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("workspace {id}")))?;

        if !PermissionPolicy::resolve(&workspace, user).can_admin {
            return Err(Error::Forbidden(format!(
                "admin access denied on workspace {id}"
            )));
        }

        let mut set = workspace.collaborator_set();
        set.grant(&workspace.owner_id, &target.id, permission)?;

        let collaborators = set.to_json();
        let now = Utc::now();

        sqlx::query(
            "UPDATE workspaces SET collaborators = ?, last_activity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&collaborators)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, collaborator = %target.id, permission = permission.as_str(), "Shared workspace");

        // Notify as the resource owner; sharing already succeeded.
        if let Some(owner) = db::get_user(&self.db, &workspace.owner_id).await? {
            self.notifications
                .invitation(&target, &owner, workspace.kind(), &workspace.name, permission)
                .await;
        }

        Ok(Workspace {
            collaborators,
            last_activity: now,
            updated_at: now,
            ..workspace
        })
    }

    /// Revoke a collaborator's grant. Requires admin access; removing a
    /// user without a grant is a no-op.
    pub async fn remove_collaborator(
        &self,
        id: &str,
        user: &User,
        target_user_id: &str,
    ) -> Result<Workspace> {
        let mut tx = self.db.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("workspace {id}")))?;

        if !PermissionPolicy::resolve(&workspace, user).can_admin {
            return Err(Error::Forbidden(format!(
                "admin access denied on workspace {id}"
            )));
        }

        let mut set = workspace.collaborator_set();
        set.remove(target_user_id);

        let collaborators = set.to_json();
        let now = Utc::now();

        sqlx::query(
            "UPDATE workspaces SET collaborators = ?, last_activity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&collaborators)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Workspace {
            collaborators,
            last_activity: now,
            updated_at: now,
            ..workspace
        })
    }

    /// Permission introspection: the access the user holds, without
    /// requiring any level to already hold.
    pub async fn resolve_access(&self, id: &str, user: &User) -> Result<Access> {
        let workspace = self.find(id).await?;
        Ok(PermissionPolicy::resolve(&workspace, user))
    }

    async fn find(&self, id: &str) -> Result<Workspace> {
        sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("workspace {id}")))
    }
}
