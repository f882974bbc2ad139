//! Data models for Notecolab.
//!
//! Defines the core types used throughout the system: users, workspaces,
//! folders, notes, notifications, and the collaborator/permission types
//! shared by all three resource kinds.

mod collab;
mod folder;
mod note;
mod notification;
mod user;
mod workspace;

pub use collab::*;
pub use folder::*;
pub use note::*;
pub use notification::*;
pub use user::*;
pub use workspace::*;

use serde::Serialize;
use uuid::Uuid;

/// Generate a new UUID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// The three independently-permissioned resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Workspace,
    Folder,
    Note,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Workspace => "workspace",
            ResourceKind::Folder => "folder",
            ResourceKind::Note => "note",
        }
    }
}

/// A resource that carries its own owner, public flag and collaborator list.
///
/// Implemented by [`Workspace`], [`Folder`] and [`Note`] so the permission
/// policy and the accessible-set predicate are written once. There is no
/// parent fallback: each resource's own flags and collaborators are
/// authoritative.
pub trait SharedResource {
    fn owner_id(&self) -> &str;
    fn is_public(&self) -> bool;
    fn collaborator_set(&self) -> CollaboratorSet;
    fn kind(&self) -> ResourceKind;
    fn display_name(&self) -> &str;
}

/// Paginated result envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Build a page from a fetched slice and a total row count.
    /// Pages are 1-based; per_page is clamped to at least 1.
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            items,
            total,
            page: page.max(1),
            per_page,
            total_pages,
        }
    }
}
