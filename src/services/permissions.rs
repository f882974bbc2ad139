//! Permission resolution for shared resources.
//!
//! Two read-side pieces live here:
//! - [`PermissionPolicy`]: the pure decision function answering
//!   read/write/admin for a (resource, user) pair. No I/O, never errors.
//! - [`AccessibleSetFilter`]: the "owner OR collaborator OR public"
//!   predicate used to scope listing and search queries, available both as
//!   a SQL fragment and as an in-memory check.
//!
//! Visibility is NOT inherited: a public workspace does not make its
//! private folders or notes readable. Each resource's own flags and
//! collaborator list are authoritative.

use serde::Serialize;
use tracing::debug;

use crate::models::{Permission, SharedResource, User};

/// The answer to a permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Access {
    pub can_read: bool,
    pub can_write: bool,
    pub can_admin: bool,
}

impl Access {
    pub const NONE: Access = Access {
        can_read: false,
        can_write: false,
        can_admin: false,
    };

    pub const ALL: Access = Access {
        can_read: true,
        can_write: true,
        can_admin: true,
    };

    pub const READ_ONLY: Access = Access {
        can_read: true,
        can_write: false,
        can_admin: false,
    };

    /// Check this access against a required level.
    pub fn satisfies(&self, required: Permission) -> bool {
        match required {
            Permission::Read => self.can_read,
            Permission::Write => self.can_write,
            Permission::Admin => self.can_admin,
        }
    }
}

impl From<Permission> for Access {
    fn from(permission: Permission) -> Self {
        Access {
            can_read: true,
            can_write: permission.satisfies(Permission::Write),
            can_admin: permission.satisfies(Permission::Admin),
        }
    }
}

/// Pure permission decision function, identical for all resource kinds.
pub struct PermissionPolicy;

impl PermissionPolicy {
    /// Resolve the access a user holds on a resource.
    ///
    /// 1. The owner holds everything, regardless of collaborators or the
    ///    public flag.
    /// 2. A collaborator grant applies its level: admin implies write and
    ///    read, write implies read.
    /// 3. A public resource grants read only.
    /// 4. Otherwise no access. Absence of access is `false`, not an error;
    ///    services convert it into `Forbidden`.
    pub fn resolve(resource: &impl SharedResource, user: &User) -> Access {
        let access = if user.id == resource.owner_id() {
            Access::ALL
        } else if let Some(permission) = resource.collaborator_set().permission_of(&user.id) {
            Access::from(permission)
        } else if resource.is_public() {
            Access::READ_ONLY
        } else {
            Access::NONE
        };

        debug!(
            user_id = %user.id,
            kind = resource.kind().as_str(),
            resource = resource.display_name(),
            access = ?access,
            "Resolved access"
        );

        access
    }
}

/// Read-side scoping predicate for listing and search.
pub struct AccessibleSetFilter;

impl AccessibleSetFilter {
    /// SQL fragment selecting rows the user can see. The caller must bind
    /// the user id TWICE, in order, right after any earlier binds.
    ///
    /// Matches rows where the user owns the resource, holds a collaborator
    /// grant (scanned out of the JSON collaborators column), or the resource
    /// is public.
    pub fn predicate_sql(owner_col: &str) -> String {
        format!(
            "({owner_col} = ? \
             OR EXISTS (SELECT 1 FROM json_each(COALESCE(collaborators, '[]')) \
                        WHERE json_extract(json_each.value, '$.user_id') = ?) \
             OR is_public = 1)"
        )
    }

    /// The same predicate evaluated in memory, for permission-introspection
    /// paths that already hold the resource.
    pub fn matches(resource: &impl SharedResource, user: &User) -> bool {
        user.id == resource.owner_id()
            || resource.collaborator_set().contains(&user.id)
            || resource.is_public()
    }
}
