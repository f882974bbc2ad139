//! Business logic services.
//!
//! Each service owns the rules for one resource kind and shares two
//! cross-cutting pieces: [`permissions`] resolves what a user may do with
//! any shared resource, and [`hierarchy`] guards structural moves and
//! deletions. Services check permissions inside the same transaction that
//! performs the mutation, so a concurrent revocation cannot slip an edit
//! through.

pub mod folder;
pub mod hierarchy;
pub mod note;
pub mod notify;
pub mod permissions;
pub mod users;
pub mod workspace;

pub use folder::FolderService;
pub use hierarchy::{DeleteBlock, HierarchyGuard};
pub use note::NoteService;
pub use notify::{LogMailer, Mailer, NotificationService};
pub use permissions::{Access, AccessibleSetFilter, PermissionPolicy};
pub use users::UserService;
pub use workspace::WorkspaceService;
