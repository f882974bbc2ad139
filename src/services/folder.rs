//! Folder service.
//!
//! Folders live inside exactly one workspace and may nest under a parent
//! folder in the same workspace. Listing within a workspace requires read
//! access on the workspace itself; individual folders then filter through
//! the accessible-set predicate like every other resource.

use chrono::Utc;
use tracing::{debug, info};

use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use crate::models::{
    Folder, FolderCreate, FolderUpdate, Note, Permission, SharedResource, User, Workspace,
};

use super::hierarchy::HierarchyGuard;
use super::permissions::{Access, AccessibleSetFilter, PermissionPolicy};
use super::NotificationService;

#[derive(Clone)]
pub struct FolderService {
    db: DbPool,
    notifications: NotificationService,
}

impl FolderService {
    pub fn new(db: DbPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    /// Create a folder. Requires write access on the target workspace; a
    /// parent folder must exist and live in the same workspace.
    pub async fn create(&self, user: &User, data: FolderCreate) -> Result<Folder> {
        if data.name.trim().is_empty() {
            return Err(Error::InvalidInput("folder name is required".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
            .bind(&data.workspace_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("workspace {}", data.workspace_id)))?;

        if !PermissionPolicy::resolve(&workspace, user).can_write {
            return Err(Error::Forbidden(format!(
                "write access denied on workspace {}",
                workspace.id
            )));
        }

        if let Some(parent_id) = &data.parent_id {
            let parent = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::NotFound(format!("parent folder {parent_id}")))?;

            if !HierarchyGuard::can_attach_folder(&parent, &data.workspace_id) {
                return Err(Error::InvalidOperation(
                    "parent folder belongs to a different workspace".to_string(),
                ));
            }
        }

        let folder = Folder::new(data, &user.id);

        sqlx::query(
            r#"
            INSERT INTO folders (id, name, description, workspace_id, parent_id, owner_id, color, is_public, collaborators, last_activity, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&folder.id)
        .bind(&folder.name)
        .bind(&folder.description)
        .bind(&folder.workspace_id)
        .bind(&folder.parent_id)
        .bind(&folder.owner_id)
        .bind(&folder.color)
        .bind(folder.is_public)
        .bind(&folder.collaborators)
        .bind(folder.last_activity)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %folder.id, workspace = %folder.workspace_id, "Created folder");

        Ok(folder)
    }

    /// Get a folder the user can read.
    pub async fn get(&self, id: &str, user: &User) -> Result<Folder> {
        let folder = self.find(id).await?;

        if !PermissionPolicy::resolve(&folder, user).can_read {
            return Err(Error::Forbidden(format!("read access denied on folder {id}")));
        }

        Ok(folder)
    }

    /// Accessible folders in a workspace. Requires read access on the
    /// workspace itself.
    pub async fn list_by_workspace(&self, workspace_id: &str, user: &User) -> Result<Vec<Folder>> {
        self.require_workspace_read(workspace_id, user).await?;

        let sql = format!(
            "SELECT * FROM folders WHERE workspace_id = ? AND {} ORDER BY name ASC",
            AccessibleSetFilter::predicate_sql("owner_id")
        );

        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(workspace_id)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(folders)
    }

    /// Search accessible folders in a workspace by name or description.
    pub async fn search(
        &self,
        workspace_id: &str,
        user: &User,
        query: &str,
    ) -> Result<Vec<Folder>> {
        self.require_workspace_read(workspace_id, user).await?;

        let sql = format!(
            "SELECT * FROM folders WHERE workspace_id = ? AND {} \
             AND (LOWER(name) LIKE ? OR LOWER(COALESCE(description, '')) LIKE ?) \
             ORDER BY name ASC",
            AccessibleSetFilter::predicate_sql("owner_id")
        );
        let pattern = format!("%{}%", query.to_lowercase());

        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(workspace_id)
            .bind(&user.id)
            .bind(&user.id)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.db)
            .await?;

        Ok(folders)
    }

    /// Accessible root folders of a workspace (no parent).
    pub async fn hierarchy(&self, workspace_id: &str, user: &User) -> Result<Vec<Folder>> {
        self.require_workspace_read(workspace_id, user).await?;

        let sql = format!(
            "SELECT * FROM folders WHERE workspace_id = ? AND parent_id IS NULL AND {} ORDER BY name ASC",
            AccessibleSetFilter::predicate_sql("owner_id")
        );

        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(workspace_id)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(folders)
    }

    /// Accessible children of a folder, looked up by containing id.
    pub async fn children(&self, parent_id: &str, user: &User) -> Result<Vec<Folder>> {
        let sql = format!(
            "SELECT * FROM folders WHERE parent_id = ? AND {} ORDER BY name ASC",
            AccessibleSetFilter::predicate_sql("owner_id")
        );

        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(parent_id)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(folders)
    }

    /// Accessible, non-archived notes in a folder, optionally filtered by a
    /// search term.
    pub async fn notes(
        &self,
        folder_id: &str,
        user: &User,
        search: Option<&str>,
    ) -> Result<Vec<Note>> {
        let predicate = AccessibleSetFilter::predicate_sql("author_id");

        let notes = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let sql = format!(
                    "SELECT * FROM notes WHERE folder_id = ? AND {predicate} AND is_archived = 0 \
                     AND (LOWER(title) LIKE ? OR LOWER(content) LIKE ?) \
                     ORDER BY last_activity DESC"
                );
                let pattern = format!("%{}%", term.to_lowercase());
                sqlx::query_as::<_, Note>(&sql)
                    .bind(folder_id)
                    .bind(&user.id)
                    .bind(&user.id)
                    .bind(&pattern)
                    .bind(&pattern)
                    .fetch_all(&self.db)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT * FROM notes WHERE folder_id = ? AND {predicate} AND is_archived = 0 \
                     ORDER BY last_activity DESC"
                );
                sqlx::query_as::<_, Note>(&sql)
                    .bind(folder_id)
                    .bind(&user.id)
                    .bind(&user.id)
                    .fetch_all(&self.db)
                    .await?
            }
        };

        Ok(notes)
    }

    /// Partial update. Requires write access; refreshes last activity.
    pub async fn update(&self, id: &str, user: &User, data: FolderUpdate) -> Result<Folder> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder {id}")))?;

        if !PermissionPolicy::resolve(&existing, user).can_write {
            return Err(Error::Forbidden(format!("write access denied on folder {id}")));
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
            UPDATE folders
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

        debug!(id = %id, "Updated folder");

        Ok(Folder {
            name,
            description,
            color,
            is_public,
            last_activity: now,
            updated_at: now,
            ..existing
        })
    }

    /// Delete a folder. Requires admin access; blocked while sub-folders or
    /// notes still live in it.
    pub async fn delete(&self, id: &str, user: &User) -> Result<()> {
        let mut tx = self.db.begin().await?;

        let folder = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder {id}")))?;

        if !PermissionPolicy::resolve(&folder, user).can_admin {
            return Err(Error::Forbidden(format!("admin access denied on folder {id}")));
        }

        if let Some(block) = HierarchyGuard::folder_delete_block(&mut *tx, id).await? {
            return Err(Error::Conflict(format!(
                "cannot delete folder: {}",
                block.reason()
            )));
        }

        sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Deleted folder");

        Ok(())
    }

    /// Share the folder with a user resolved by email. Requires admin
    /// access. Re-inviting replaces the existing grant.
    pub async fn add_collaborator(
        &self,
        id: &str,
        user: &User,
        email: &str,
        permission: Permission,
    ) -> Result<Folder> {
        let target = db::find_active_by_email(&self.db, email)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no active user with email {email}")))?;

        let mut tx = self.db.begin().await?;

        let folder = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder {id}")))?;

        if !PermissionPolicy::resolve(&folder, user).can_admin {
            return Err(Error::Forbidden(format!("admin access denied on folder {id}")));
        }

        let mut set = folder.collaborator_set();
        set.grant(&folder.owner_id, &target.id, permission)?;

        let collaborators = set.to_json();
        let now = Utc::now();

        sqlx::query(
            "UPDATE folders SET collaborators = ?, last_activity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&collaborators)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, collaborator = %target.id, permission = permission.as_str(), "Shared folder");

        if let Some(owner) = db::get_user(&self.db, &folder.owner_id).await? {
            self.notifications
                .invitation(&target, &owner, folder.kind(), &folder.name, permission)
                .await;
        }

        Ok(Folder {
            collaborators,
            last_activity: now,
            updated_at: now,
            ..folder
        })
    }

    /// Revoke a collaborator's grant. Requires admin access; removing a
    /// user without a grant is a no-op.
    pub async fn remove_collaborator(
        &self,
        id: &str,
        user: &User,
        target_user_id: &str,
    ) -> Result<Folder> {
        let mut tx = self.db.begin().await?;

        let folder = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder {id}")))?;

        if !PermissionPolicy::resolve(&folder, user).can_admin {
            return Err(Error::Forbidden(format!("admin access denied on folder {id}")));
        }

        let mut set = folder.collaborator_set();
        set.remove(target_user_id);

        let collaborators = set.to_json();
        let now = Utc::now();

        sqlx::query(
            "UPDATE folders SET collaborators = ?, last_activity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&collaborators)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Folder {
            collaborators,
            last_activity: now,
            updated_at: now,
            ..folder
        })
    }

    /// Permission introspection for a folder.
    pub async fn resolve_access(&self, id: &str, user: &User) -> Result<Access> {
        let folder = self.find(id).await?;
        Ok(PermissionPolicy::resolve(&folder, user))
    }

    async fn find(&self, id: &str) -> Result<Folder> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder {id}")))
    }

    async fn require_workspace_read(&self, workspace_id: &str, user: &User) -> Result<Workspace> {
        let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
            .bind(workspace_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("workspace {workspace_id}")))?;

        if !PermissionPolicy::resolve(&workspace, user).can_read {
            return Err(Error::Forbidden(format!(
                "read access denied on workspace {workspace_id}"
            )));
        }

        Ok(workspace)
    }
}
