//! Activity notifications.
//!
//! Services receive an `Arc<dyn Notifier>` at construction; there is no process-wide
//! dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::backend::{DocumentStore, encode};
use crate::errors::ImmerseError;
use crate::id::generate_document_id;
use crate::keys;
use crate::types::{Notification, NotificationKind};

/// Something worth telling `recipient` about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub recipient: String,
    pub actor: String,
    pub kind: NotificationKind,
    pub post_id: Option<String>,
}

impl NotificationEvent {
    pub fn new(recipient: impl Into<String>, actor: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            recipient: recipient.into(),
            actor: actor.into(),
            kind,
            post_id: None,
        }
    }

    pub fn with_post(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    /// Users are never notified about their own activity.
    pub fn is_self_directed(&self) -> bool {
        self.recipient == self.actor
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: NotificationEvent) -> crate::Result<()>;

    /// Withdraws notifications previously published for the same recipient, actor, kind and post.
    async fn retract(&self, event: NotificationEvent) -> crate::Result<()>;
}

/// Writes notifications as documents under the recipient.
pub struct StoreNotifier {
    store: Arc<dyn DocumentStore>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn publish(&self, event: NotificationEvent) -> crate::Result<()> {
        if event.is_self_directed() {
            return Ok(());
        }
        let notification = Notification {
            id: generate_document_id(),
            kind: event.kind,
            uid: event.actor,
            post_id: event.post_id,
            timestamp: Utc::now(),
            actor: None,
        };
        let path = format!("{}/{}", keys::notifications(&event.recipient), notification.id);
        let document = encode(&notification).map_err(|err| ImmerseError::write("notification", err))?;
        self.store
            .set(&path, document)
            .await
            .map_err(|err| ImmerseError::write("notification", err))
    }

    async fn retract(&self, event: NotificationEvent) -> crate::Result<()> {
        if event.is_self_directed() {
            return Ok(());
        }
        let collection = keys::notifications(&event.recipient);
        let matches = self
            .store
            .find_eq(&collection, "uid", &json!(event.actor))
            .await
            .map_err(|err| ImmerseError::fetch("notifications", err))?;
        let kind = json!(event.kind);
        let post_id = event.post_id.as_deref().map(|id| json!(id));
        for document in matches {
            if document.data.get("type") != Some(&kind) {
                continue;
            }
            if post_id.is_some() && document.data.get("postId") != post_id.as_ref() {
                continue;
            }
            self.store
                .delete(&format!("{collection}/{}", document.id))
                .await
                .map_err(|err| ImmerseError::write("notification", err))?;
        }
        Ok(())
    }
}
