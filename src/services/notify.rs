//! Notification service and the outbound email seam.
//!
//! Notifications created as side effects of sharing and editing are
//! fire-and-forget: a failure here is logged and swallowed, never rolled
//! back into the resource operation that triggered it. The user-facing
//! listing/mark-read API delegates to the query module.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::db::{self, DbPool};
use crate::models::{
    Notification, NotificationCreate, NotificationKind, Page, Permission, ResourceKind, User,
};
use crate::Result;

/// Outbound email dispatch, implemented by the consuming application.
///
/// Delivery is fire-and-forget from this core's perspective; implementations
/// should not block on remote transport longer than necessary.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(
        &self,
        to_email: &str,
        inviter_name: &str,
        kind: ResourceKind,
        resource_name: &str,
        permission: Permission,
    ) -> Result<()>;

    async fn send_modification(
        &self,
        to_email: &str,
        modifier_name: &str,
        note_title: &str,
    ) -> Result<()>;

    async fn send_welcome(&self, to_email: &str, user_name: &str) -> Result<()>;
}

/// Default mailer that only logs. Useful in tests and when no transport is
/// configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(
        &self,
        to_email: &str,
        inviter_name: &str,
        kind: ResourceKind,
        resource_name: &str,
        permission: Permission,
    ) -> Result<()> {
        info!(
            to = %to_email,
            inviter = %inviter_name,
            kind = kind.as_str(),
            resource = %resource_name,
            permission = permission.as_str(),
            "Invitation email (log only)"
        );
        Ok(())
    }

    async fn send_modification(
        &self,
        to_email: &str,
        modifier_name: &str,
        note_title: &str,
    ) -> Result<()> {
        info!(
            to = %to_email,
            modifier = %modifier_name,
            note = %note_title,
            "Modification email (log only)"
        );
        Ok(())
    }

    async fn send_welcome(&self, to_email: &str, user_name: &str) -> Result<()> {
        info!(to = %to_email, user = %user_name, "Welcome email (log only)");
        Ok(())
    }
}

/// Service for creating and consuming notifications.
#[derive(Clone)]
pub struct NotificationService {
    db: DbPool,
    mailer: Arc<dyn Mailer>,
}

impl NotificationService {
    pub fn new(db: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    /// List notifications for a user, newest first.
    pub async fn list(
        &self,
        user: &User,
        page: i64,
        per_page: i64,
        unread_only: bool,
    ) -> Result<Page<Notification>> {
        db::list_notifications(&self.db, &user.id, page, per_page, unread_only).await
    }

    pub async fn unread_count(&self, user: &User) -> Result<i64> {
        db::unread_count(&self.db, &user.id).await
    }

    /// Mark specific notifications as read; ids not addressed to the user
    /// are ignored.
    pub async fn mark_as_read(&self, user: &User, ids: &[String]) -> Result<u64> {
        db::mark_as_read(&self.db, &user.id, ids).await
    }

    pub async fn mark_all_as_read(&self, user: &User) -> Result<u64> {
        db::mark_all_as_read(&self.db, &user.id).await
    }

    /// Record a share invitation and send the matching email.
    /// Fire-and-forget: failures are logged, never propagated.
    pub async fn invitation(
        &self,
        recipient: &User,
        sender: &User,
        kind: ResourceKind,
        resource_name: &str,
        permission: Permission,
    ) {
        let message = format!(
            "{} invited you to collaborate on {} \"{}\" with {} permission",
            sender.name,
            kind.as_str(),
            resource_name,
            permission.as_str()
        );

        let mut input =
            NotificationCreate::new(&recipient.id, NotificationKind::ShareInvitation, message);
        input.sender_id = Some(sender.id.clone());
        input.metadata = HashMap::from([
            ("resource_kind".to_string(), kind.as_str().to_string()),
            ("permission".to_string(), permission.as_str().to_string()),
        ]);

        if let Err(e) = db::create_notification(&self.db, input).await {
            warn!(recipient = %recipient.id, "Failed to create invitation notification: {}", e);
        }

        if let Err(e) = self
            .mailer
            .send_invitation(
                &recipient.email,
                &sender.name,
                kind,
                resource_name,
                permission,
            )
            .await
        {
            warn!(recipient = %recipient.email, "Failed to send invitation email: {}", e);
        }
    }

    /// Record a content-modified notification for one recipient.
    /// Fire-and-forget: failures are logged, never propagated.
    pub async fn content_modified(
        &self,
        recipient: &User,
        sender: &User,
        note_id: &str,
        note_title: &str,
    ) {
        let message = format!("{} modified \"{}\"", sender.name, note_title);

        let mut input =
            NotificationCreate::new(&recipient.id, NotificationKind::ContentModified, message);
        input.sender_id = Some(sender.id.clone());
        input.note_id = Some(note_id.to_string());

        if let Err(e) = db::create_notification(&self.db, input).await {
            warn!(recipient = %recipient.id, "Failed to create modification notification: {}", e);
        }

        if let Err(e) = self
            .mailer
            .send_modification(&recipient.email, &sender.name, note_title)
            .await
        {
            warn!(recipient = %recipient.email, "Failed to send modification email: {}", e);
        }
    }

    /// Send the post-registration welcome email. Fire-and-forget.
    pub async fn welcome(&self, user: &User) {
        if let Err(e) = self.mailer.send_welcome(&user.email, &user.name).await {
            warn!(recipient = %user.email, "Failed to send welcome email: {}", e);
        }
    }

    /// Create a system notification addressed to a user.
    pub async fn system(&self, recipient: &User, message: String) -> Result<Notification> {
        db::create_notification(
            &self.db,
            NotificationCreate::new(&recipient.id, NotificationKind::System, message),
        )
        .await
    }
}
