use log::warn;

use super::ServiceContext;
use super::user::fetch_profiles;
use crate::backend::decode;
use crate::errors::ImmerseError;
use crate::keys;
use crate::types::Notification;

pub struct NotificationService {
    ctx: ServiceContext,
}

impl NotificationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// The viewer's notifications, newest first, with the acting users attached.
    pub async fn fetch_notifications(&self) -> crate::Result<Vec<Notification>> {
        let viewer = self.ctx.session.viewer()?;
        let documents = self
            .ctx
            .store
            .list(&keys::notifications(&viewer.id))
            .await
            .map_err(|err| ImmerseError::fetch("notifications", err))?;
        let mut notifications: Vec<Notification> = documents
            .into_iter()
            .filter_map(|document| {
                let id = document.id;
                decode::<Notification>(document.data)
                    .inspect_err(|err| warn!("skipping malformed notification {id}: {err}"))
                    .ok()
            })
            .collect();
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let actors = fetch_profiles(
            self.ctx.store.as_ref(),
            notifications.iter().map(|notification| notification.uid.as_str()),
        )
        .await;
        for notification in &mut notifications {
            notification.actor = actors.get(&notification.uid).cloned();
        }
        Ok(notifications)
    }
}
