//! Containment invariants for the workspace/folder/note hierarchy.
//!
//! The guard answers structural questions only; it never raises. Services
//! convert a reported block into a `Conflict` error naming the rule that
//! fired. Deletion checks take a connection so they run inside the same
//! transaction as the delete, re-validating at commit time.

use sqlx::SqliteConnection;

use crate::models::Folder;
use crate::Result;

/// Why a container cannot be deleted right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBlock {
    /// Child workspaces still reference this workspace as parent.
    ChildWorkspaces,
    /// Folders still live in this container.
    Folders,
    /// Notes still live in this container.
    Notes,
    /// Child folders still reference this folder as parent.
    ChildFolders,
}

impl DeleteBlock {
    /// Human-readable reason for the Conflict message.
    pub fn reason(&self) -> &'static str {
        match self {
            DeleteBlock::ChildWorkspaces => "it contains sub-workspaces",
            DeleteBlock::Folders => "it contains folders",
            DeleteBlock::Notes => "it contains notes",
            DeleteBlock::ChildFolders => "it contains sub-folders",
        }
    }
}

pub struct HierarchyGuard;

impl HierarchyGuard {
    /// A folder may only nest under a parent in the same workspace.
    pub fn can_attach_folder(parent: &Folder, workspace_id: &str) -> bool {
        parent.workspace_id == workspace_id
    }

    /// Check whether a workspace is deletable. Returns the first blocking
    /// rule, or `None` when the workspace is empty.
    pub async fn workspace_delete_block(
        conn: &mut SqliteConnection,
        workspace_id: &str,
    ) -> Result<Option<DeleteBlock>> {
        let children: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM workspaces WHERE parent_id = ?")
                .bind(workspace_id)
                .fetch_one(&mut *conn)
                .await?;
        if children > 0 {
            return Ok(Some(DeleteBlock::ChildWorkspaces));
        }

        let folders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE workspace_id = ?")
            .bind(workspace_id)
            .fetch_one(&mut *conn)
            .await?;
        if folders > 0 {
            return Ok(Some(DeleteBlock::Folders));
        }

        let notes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE workspace_id = ?")
            .bind(workspace_id)
            .fetch_one(&mut *conn)
            .await?;
        if notes > 0 {
            return Ok(Some(DeleteBlock::Notes));
        }

        Ok(None)
    }

    /// Check whether a folder is deletable. Returns the first blocking
    /// rule, or `None` when the folder is empty.
    pub async fn folder_delete_block(
        conn: &mut SqliteConnection,
        folder_id: &str,
    ) -> Result<Option<DeleteBlock>> {
        let children: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE parent_id = ?")
            .bind(folder_id)
            .fetch_one(&mut *conn)
            .await?;
        if children > 0 {
            return Ok(Some(DeleteBlock::ChildFolders));
        }

        let notes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE folder_id = ?")
            .bind(folder_id)
            .fetch_one(&mut *conn)
            .await?;
        if notes > 0 {
            return Ok(Some(DeleteBlock::Notes));
        }

        Ok(None)
    }
}
