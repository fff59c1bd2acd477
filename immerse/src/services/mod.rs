//! Backend-facing services. Each one is a thin layer of document reads and writes.

pub mod comment;
pub mod feed;
pub mod notification;
pub mod post;
pub mod upload;
pub mod user;

use std::sync::Arc;

use log::warn;

use crate::backend::DocumentStore;
use crate::notify::{NotificationEvent, Notifier};
use crate::session::Session;

pub use comment::CommentService;
pub use feed::FeedService;
pub use notification::NotificationService;
pub use post::PostService;
pub use upload::{NewPost, UploadKind, UploadService};
pub use user::{UserList, UserService};

/// Collaborators shared by every service.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn DocumentStore>,
    pub session: Arc<Session>,
    pub notifier: Arc<dyn Notifier>,
}

impl ServiceContext {
    pub fn new(store: Arc<dyn DocumentStore>, session: Arc<Session>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            session,
            notifier,
        }
    }

    /// Notifications are best effort; a failure never undoes the action that caused it.
    pub(crate) async fn notify(&self, event: NotificationEvent) {
        if let Err(err) = self.notifier.publish(event).await {
            warn!("failed to publish notification: {err}");
        }
    }

    pub(crate) async fn retract(&self, event: NotificationEvent) {
        if let Err(err) = self.notifier.retract(event).await {
            warn!("failed to retract notification: {err}");
        }
    }
}
