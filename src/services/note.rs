//! Note service.
//!
//! Notes carry an integer version that counts edit attempts: every
//! successful update increments it by exactly one, whether or not a field
//! actually changed. Archiving is a visibility concern, not a lock:
//! toggling it requires admin access but leaves the version alone, and
//! edits on an archived note remain possible for writers.

use chrono::Utc;
use tracing::{debug, info};

use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use crate::models::{
    to_json_list, Folder, Note, NoteCreate, NoteUpdate, Page, Permission, SharedResource, User,
    Workspace,
};

use super::permissions::{Access, AccessibleSetFilter, PermissionPolicy};
use super::NotificationService;

#[derive(Clone)]
pub struct NoteService {
    db: DbPool,
    notifications: NotificationService,
}

impl NoteService {
    pub fn new(db: DbPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    /// Create a note. Requires write access on the target workspace and,
    /// when a folder is given, on the folder too. Folder and parent ids
    /// must resolve; the folder must belong to the target workspace.
    /// Existence is re-checked inside the insert transaction, so a
    /// concurrently deleted workspace surfaces as `NotFound`.
    pub async fn create(&self, user: &User, data: NoteCreate) -> Result<Note> {
        if data.title.trim().is_empty() {
            return Err(Error::InvalidInput("note title is required".to_string()));
        }
        if data.content.is_empty() {
            return Err(Error::InvalidInput("note content is required".to_string()));
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

        if let Some(folder_id) = &data.folder_id {
            let folder = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
                .bind(folder_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::NotFound(format!("folder {folder_id}")))?;

            if folder.workspace_id != data.workspace_id {
                return Err(Error::InvalidOperation(
                    "folder belongs to a different workspace".to_string(),
                ));
            }

            if !PermissionPolicy::resolve(&folder, user).can_write {
                return Err(Error::Forbidden(format!(
                    "write access denied on folder {folder_id}"
                )));
            }
        }

        if let Some(parent_id) = &data.parent_id {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE id = ?")
                .bind(parent_id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                return Err(Error::NotFound(format!("parent note {parent_id}")));
            }
        }

        let note = Note::new(data, &user.id);

        sqlx::query(
            r#"
            INSERT INTO notes (id, title, content, author_id, workspace_id, folder_id, parent_id, tags, is_public, is_archived, color, version, refs, collaborators, last_activity, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&note.id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.author_id)
        .bind(&note.workspace_id)
        .bind(&note.folder_id)
        .bind(&note.parent_id)
        .bind(&note.tags)
        .bind(note.is_public)
        .bind(note.is_archived)
        .bind(&note.color)
        .bind(note.version)
        .bind(&note.refs)
        .bind(&note.collaborators)
        .bind(note.last_activity)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %note.id, workspace = %note.workspace_id, "Created note");

        Ok(note)
    }

    /// Get a note the user can read.
    pub async fn get(&self, id: &str, user: &User) -> Result<Note> {
        let note = self.find(id).await?;

        if !PermissionPolicy::resolve(&note, user).can_read {
            return Err(Error::Forbidden(format!("read access denied on note {id}")));
        }

        Ok(note)
    }

    /// Paged listing of notes visible to the user. `archived` of `None`
    /// includes both states.
    pub async fn list_accessible(
        &self,
        user: &User,
        page: i64,
        per_page: i64,
        archived: Option<bool>,
    ) -> Result<Page<Note>> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page - 1) * per_page;

        let predicate = AccessibleSetFilter::predicate_sql("author_id");
        let archived_clause = match archived {
            Some(true) => "AND is_archived = 1",
            Some(false) => "AND is_archived = 0",
            None => "",
        };

        let items = sqlx::query_as::<_, Note>(&format!(
            "SELECT * FROM notes WHERE {predicate} {archived_clause} \
             ORDER BY last_activity DESC LIMIT ? OFFSET ?"
        ))
        .bind(&user.id)
        .bind(&user.id)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM notes WHERE {predicate} {archived_clause}"
        ))
        .bind(&user.id)
        .bind(&user.id)
        .fetch_one(&self.db)
        .await?;

        Ok(Page::new(items, total, page, per_page))
    }

    /// Search non-archived accessible notes by title or content.
    pub async fn search(&self, user: &User, query: &str) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT * FROM notes WHERE {} AND is_archived = 0 \
             AND (LOWER(title) LIKE ? OR LOWER(content) LIKE ?) \
             ORDER BY last_activity DESC",
            AccessibleSetFilter::predicate_sql("author_id")
        );
        let pattern = format!("%{}%", query.to_lowercase());

        let notes = sqlx::query_as::<_, Note>(&sql)
            .bind(&user.id)
            .bind(&user.id)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.db)
            .await?;

        Ok(notes)
    }

    /// Accessible, non-archived notes in a workspace.
    pub async fn list_by_workspace(&self, workspace_id: &str, user: &User) -> Result<Vec<Note>> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workspaces WHERE id = ?")
            .bind(workspace_id)
            .fetch_one(&self.db)
            .await?;
        if exists == 0 {
            return Err(Error::NotFound(format!("workspace {workspace_id}")));
        }

        let sql = format!(
            "SELECT * FROM notes WHERE workspace_id = ? AND {} AND is_archived = 0 \
             ORDER BY last_activity DESC",
            AccessibleSetFilter::predicate_sql("author_id")
        );

        let notes = sqlx::query_as::<_, Note>(&sql)
            .bind(workspace_id)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(notes)
    }

    /// Accessible, non-archived notes in a folder.
    pub async fn list_by_folder(&self, folder_id: &str, user: &User) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT * FROM notes WHERE folder_id = ? AND {} AND is_archived = 0 \
             ORDER BY last_activity DESC",
            AccessibleSetFilter::predicate_sql("author_id")
        );

        let notes = sqlx::query_as::<_, Note>(&sql)
            .bind(folder_id)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(notes)
    }

    /// Accessible, non-archived child notes of a parent note.
    pub async fn children(&self, parent_id: &str, user: &User) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT * FROM notes WHERE parent_id = ? AND {} AND is_archived = 0 \
             ORDER BY last_activity DESC",
            AccessibleSetFilter::predicate_sql("author_id")
        );

        let notes = sqlx::query_as::<_, Note>(&sql)
            .bind(parent_id)
            .bind(&user.id)
            .bind(&user.id)
            .fetch_all(&self.db)
            .await?;

        Ok(notes)
    }

    /// Partial update. Requires write access. The version is incremented
    /// and activity refreshed on every successful call, even when no field
    /// changed value. Collaborators and the author (minus the editor) get a
    /// fire-and-forget content-modified notification after commit.
    pub async fn update(&self, id: &str, user: &User, data: NoteUpdate) -> Result<Note> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;

        if !PermissionPolicy::resolve(&existing, user).can_write {
            return Err(Error::Forbidden(format!("write access denied on note {id}")));
        }

        if let Some(references) = &data.references {
            if references.iter().any(|r| r.note_id == id) {
                return Err(Error::InvalidOperation(
                    "a note cannot reference itself".to_string(),
                ));
            }
        }

        let title = match data.title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => existing.title,
        };
        let content = data.content.unwrap_or(existing.content);
        let tags = data.tags.map(|t| to_json_list(&t)).unwrap_or(existing.tags);
        let is_public = data.is_public.unwrap_or(existing.is_public);
        let color = data.color.unwrap_or(existing.color);
        let refs = match data.references {
            Some(r) if r.is_empty() => None,
            Some(r) => Some(serde_json::to_string(&r)?),
            None => existing.refs,
        };
        let version = existing.version + 1;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE notes
            SET title = ?, content = ?, tags = ?, is_public = ?, color = ?, refs = ?,
                version = ?, last_activity = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&title)
        .bind(&content)
        .bind(&tags)
        .bind(is_public)
        .bind(&color)
        .bind(&refs)
        .bind(version)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(id = %id, version = version, "Updated note");

        let updated = Note {
            title,
            content,
            tags,
            is_public,
            color,
            refs,
            version,
            last_activity: now,
            updated_at: now,
            ..existing
        };

        self.notify_modified(&updated, user).await;

        Ok(updated)
    }

    /// Flip the archived flag. Requires admin access; reversible; the
    /// version counter is untouched.
    pub async fn toggle_archive(&self, id: &str, user: &User) -> Result<Note> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;

        if !PermissionPolicy::resolve(&existing, user).can_admin {
            return Err(Error::Forbidden(format!("admin access denied on note {id}")));
        }

        let archived = !existing.is_archived;
        let now = Utc::now();

        sqlx::query(
            "UPDATE notes SET is_archived = ?, last_activity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(archived)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, archived = archived, "Toggled note archive");

        Ok(Note {
            is_archived: archived,
            last_activity: now,
            updated_at: now,
            ..existing
        })
    }

    /// Delete a note. Requires admin access. Dependent notifications are
    /// removed in the same transaction so no row dangles on a deleted note.
    pub async fn delete(&self, id: &str, user: &User) -> Result<()> {
        let mut tx = self.db.begin().await?;

        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;

        if !PermissionPolicy::resolve(&note, user).can_admin {
            return Err(Error::Forbidden(format!("admin access denied on note {id}")));
        }

        db::delete_for_note(&mut *tx, id).await?;

        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, "Deleted note");

        Ok(())
    }

    /// Share the note with a user resolved by email. Requires admin access.
    /// Re-inviting replaces the existing grant.
    pub async fn add_collaborator(
        &self,
        id: &str,
        user: &User,
        email: &str,
        permission: Permission,
    ) -> Result<Note> {
        let target = db::find_active_by_email(&self.db, email)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no active user with email {email}")))?;

        let mut tx = self.db.begin().await?;

        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;

        if !PermissionPolicy::resolve(&note, user).can_admin {
            return Err(Error::Forbidden(format!("admin access denied on note {id}")));
        }

        let mut set = note.collaborator_set();
        set.grant(&note.author_id, &target.id, permission)?;

        let collaborators = set.to_json();
        let now = Utc::now();

        sqlx::query(
            "UPDATE notes SET collaborators = ?, last_activity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&collaborators)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, collaborator = %target.id, permission = permission.as_str(), "Shared note");

        if let Some(owner) = db::get_user(&self.db, &note.author_id).await? {
            self.notifications
                .invitation(&target, &owner, note.kind(), &note.title, permission)
                .await;
        }

        Ok(Note {
            collaborators,
            last_activity: now,
            updated_at: now,
            ..note
        })
    }

    /// Revoke a collaborator's grant. Requires admin access; removing a
    /// user without a grant is a no-op.
    pub async fn remove_collaborator(
        &self,
        id: &str,
        user: &User,
        target_user_id: &str,
    ) -> Result<Note> {
        let mut tx = self.db.begin().await?;

        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;

        if !PermissionPolicy::resolve(&note, user).can_admin {
            return Err(Error::Forbidden(format!("admin access denied on note {id}")));
        }

        let mut set = note.collaborator_set();
        set.remove(target_user_id);

        let collaborators = set.to_json();
        let now = Utc::now();

        sqlx::query(
            "UPDATE notes SET collaborators = ?, last_activity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&collaborators)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Note {
            collaborators,
            last_activity: now,
            updated_at: now,
            ..note
        })
    }

    /// Resolve the notes this note references, filtered to those the user
    /// can read. Order follows the reference list.
    pub async fn linked_notes(&self, id: &str, user: &User) -> Result<Vec<Note>> {
        let note = self.get(id, user).await?;

        let mut linked = Vec::new();
        for reference in note.references_vec() {
            let target = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
                .bind(&reference.note_id)
                .fetch_optional(&self.db)
                .await?;

            if let Some(target) = target {
                if AccessibleSetFilter::matches(&target, user) {
                    linked.push(target);
                }
            }
        }

        Ok(linked)
    }

    /// Permission introspection for a note.
    pub async fn resolve_access(&self, id: &str, user: &User) -> Result<Access> {
        let note = self.find(id).await?;
        Ok(PermissionPolicy::resolve(&note, user))
    }

    async fn find(&self, id: &str) -> Result<Note> {
        sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))
    }

    /// Content-modified notifications for everyone sharing the note except
    /// the editor. Fire-and-forget.
    async fn notify_modified(&self, note: &Note, editor: &User) {
        let mut recipient_ids: Vec<String> = Vec::new();
        if note.author_id != editor.id {
            recipient_ids.push(note.author_id.clone());
        }
        for collaborator in note.collaborator_set().iter() {
            if collaborator.user_id != editor.id {
                recipient_ids.push(collaborator.user_id.clone());
            }
        }

        for recipient_id in recipient_ids {
            match db::get_user(&self.db, &recipient_id).await {
                Ok(Some(recipient)) if recipient.is_active => {
                    self.notifications
                        .content_modified(&recipient, editor, &note.id, &note.title)
                        .await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(recipient = %recipient_id, "Failed to load notification recipient: {}", e);
                }
            }
        }
    }
}
