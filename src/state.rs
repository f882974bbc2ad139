//! Application state for Notecolab.
//!
//! Contains the shared state that is passed to all handlers.

use std::sync::Arc;

use crate::db::DbPool;
use crate::services::{
    FolderService, LogMailer, Mailer, NoteService, NotificationService, UserService,
    WorkspaceService,
};
use crate::Result;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DbPool,
    /// User registration and profile service.
    pub users: UserService,
    /// Notification creation and consumption service.
    pub notifications: NotificationService,
    /// Workspace management service.
    pub workspaces: WorkspaceService,
    /// Folder management service.
    pub folders: FolderService,
    /// Note management service.
    pub notes: NoteService,
}

impl AppState {
    /// Create a new application state backed by a database file, with
    /// log-only email dispatch.
    pub async fn new(database_path: &str) -> Result<Self> {
        Self::with_mailer(database_path, Arc::new(LogMailer)).await
    }

    /// Create a new application state with a custom mail transport.
    pub async fn with_mailer(database_path: &str, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let db = crate::db::init_pool(database_path).await?;
        crate::db::initialize_schema(&db).await?;
        Ok(Self::from_pool(db, mailer))
    }

    /// Create an application state on an in-memory database. The schema is
    /// applied up front. Uses a single-connection pool so every query sees
    /// the same in-memory database. Intended for tests.
    pub async fn in_memory() -> Result<Self> {
        let db = crate::db::create_pool_with_config(":memory:", crate::db::PoolConfig::test()).await?;
        crate::db::initialize_schema(&db).await?;
        Ok(Self::from_pool(db, Arc::new(LogMailer)))
    }

    fn from_pool(db: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        let notifications = NotificationService::new(db.clone(), mailer);
        let users = UserService::new(db.clone(), notifications.clone());
        let workspaces = WorkspaceService::new(db.clone(), notifications.clone());
        let folders = FolderService::new(db.clone(), notifications.clone());
        let notes = NoteService::new(db.clone(), notifications.clone());

        Self {
            db,
            users,
            notifications,
            workspaces,
            folders,
            notes,
        }
    }
}
