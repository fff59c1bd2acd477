//! Profiles and the user-to-user relationships: follows and blocks.

use std::collections::HashMap;

use log::warn;
use serde_json::json;

use super::ServiceContext;
use crate::backend::{DocumentStore, StoredDocument, decode, marker};
use crate::errors::{ImmerseError, StoreError};
use crate::keys;
use crate::notify::NotificationEvent;
use crate::types::{NotificationKind, User, UserStats};

/// Reads the profiles of `ids`, each unique id once. Unreadable profiles are logged and left out.
pub(crate) async fn fetch_profiles<'a, I>(store: &dyn DocumentStore, ids: I) -> HashMap<String, User>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut profiles = HashMap::new();
    for id in ids {
        if profiles.contains_key(id) {
            continue;
        }
        match read_profile(store, id).await {
            Ok(user) => {
                profiles.insert(id.to_string(), user);
            }
            Err(err) => warn!("profile {id} unavailable: {err}"),
        }
    }
    profiles
}

async fn read_profile(store: &dyn DocumentStore, uid: &str) -> crate::Result<User> {
    let document = store
        .get(&keys::user(uid))
        .await
        .map_err(|err| ImmerseError::fetch("user", err))?
        .ok_or_else(|| ImmerseError::not_found("user", uid))?;
    decode(document).map_err(|err| ImmerseError::fetch("user", err))
}

/// Which users a list screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserList {
    Blocked,
    Followers(String),
    Following(String),
    Likes(String),
    All,
}

impl UserList {
    pub fn navigation_title(&self) -> &'static str {
        match self {
            Self::Blocked => "Blocked",
            Self::Followers(_) => "Followers",
            Self::Following(_) => "Following",
            Self::Likes(_) => "Likes",
            Self::All => "Explore",
        }
    }
}

pub struct UserService {
    ctx: ServiceContext,
}

impl UserService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn fetch_user(&self, uid: &str) -> crate::Result<User> {
        read_profile(self.ctx.store.as_ref(), uid).await
    }

    /// Every profile except the viewer's own.
    pub async fn fetch_users(&self) -> crate::Result<Vec<User>> {
        let viewer = self.ctx.session.viewer().ok();
        let documents = self
            .ctx
            .store
            .list(keys::USERS)
            .await
            .map_err(|err| ImmerseError::fetch("users", err))?;
        Ok(decode_users(documents)
            .into_iter()
            .filter(|user| viewer.as_ref().is_none_or(|viewer| viewer.id != user.id))
            .collect())
    }

    pub async fn follow(&self, uid: &str) -> crate::Result<()> {
        let viewer = self.ctx.session.viewer()?;
        if viewer.id == uid {
            return Err(ImmerseError::NotPermitted {
                message: "users cannot follow themselves".into(),
            });
        }
        let following = keys::followed(&viewer.id, uid);
        self.ctx
            .store
            .set(&following, marker())
            .await
            .map_err(|err| ImmerseError::write("follow", err))?;
        if let Err(err) = self.ctx.store.set(&keys::follower(uid, &viewer.id), marker()).await {
            if let Err(undo) = self.ctx.store.delete(&following).await {
                warn!("failed to undo follow record {following}: {undo}");
            }
            return Err(ImmerseError::write("follow", err));
        }
        self.ctx
            .notify(NotificationEvent::new(uid, &viewer.id, NotificationKind::Follow))
            .await;
        Ok(())
    }

    pub async fn unfollow(&self, uid: &str) -> crate::Result<()> {
        let viewer = self.ctx.session.viewer()?;
        self.ctx
            .store
            .delete(&keys::followed(&viewer.id, uid))
            .await
            .map_err(|err| ImmerseError::write("unfollow", err))?;
        self.ctx
            .store
            .delete(&keys::follower(uid, &viewer.id))
            .await
            .map_err(|err| ImmerseError::write("unfollow", err))?;
        self.ctx
            .retract(NotificationEvent::new(uid, &viewer.id, NotificationKind::Follow))
            .await;
        Ok(())
    }

    pub async fn is_followed(&self, uid: &str) -> crate::Result<bool> {
        let viewer = self.ctx.session.viewer()?;
        self.ctx
            .store
            .exists(&keys::followed(&viewer.id, uid))
            .await
            .map_err(|err| ImmerseError::fetch("follow", err))
    }

    /// Following, followers, likes given and posts owned by `uid`.
    pub async fn fetch_user_stats(&self, uid: &str) -> crate::Result<UserStats> {
        let store = self.ctx.store.as_ref();
        let following = keys::following(uid);
        let followers = keys::followers(uid);
        let likes = keys::user_likes(uid);
        let owner = json!(uid);
        let (following, followers, likes, posts) = tokio::join!(
            store.list(&following),
            store.list(&followers),
            store.list(&likes),
            store.find_eq(keys::POSTS, "ownerUid", &owner),
        );
        let count = |result: Result<Vec<StoredDocument>, StoreError>| {
            result
                .map(|documents| documents.len() as u64)
                .map_err(|err| ImmerseError::fetch("user stats", err))
        };
        Ok(UserStats {
            following: count(following)?,
            followers: count(followers)?,
            likes: count(likes)?,
            posts: count(posts)?,
        })
    }

    pub async fn block_user(&self, uid: &str) -> crate::Result<()> {
        let viewer = self.ctx.session.viewer()?;
        if viewer.id == uid {
            return Err(ImmerseError::NotPermitted {
                message: "users cannot block themselves".into(),
            });
        }
        self.ctx
            .store
            .set(&keys::blocked_user(&viewer.id, uid), marker())
            .await
            .map_err(|err| ImmerseError::write("block", err))
    }

    pub async fn unblock_user(&self, uid: &str) -> crate::Result<()> {
        let viewer = self.ctx.session.viewer()?;
        self.ctx
            .store
            .delete(&keys::blocked_user(&viewer.id, uid))
            .await
            .map_err(|err| ImmerseError::write("unblock", err))
    }

    /// Whether the signed-in viewer has blocked `uid`.
    pub async fn is_blocked(&self, uid: &str) -> crate::Result<bool> {
        let viewer = self.ctx.session.viewer()?;
        self.has_blocked(&viewer.id, uid).await
    }

    /// Whether `viewer_id` has blocked `target_id`.
    pub async fn has_blocked(&self, viewer_id: &str, target_id: &str) -> crate::Result<bool> {
        self.ctx
            .store
            .exists(&keys::blocked_user(viewer_id, target_id))
            .await
            .map_err(|err| ImmerseError::fetch("block", err))
    }

    pub async fn blocked_users(&self) -> crate::Result<Vec<User>> {
        let viewer = self.ctx.session.viewer()?;
        self.profiles_in(&keys::blocked_users(&viewer.id), "blocked users").await
    }

    /// Resolves the ids stored in `collection` into profiles, in id order.
    async fn profiles_in(&self, collection: &str, what: &'static str) -> crate::Result<Vec<User>> {
        let records = self
            .ctx
            .store
            .list(collection)
            .await
            .map_err(|err| ImmerseError::fetch(what, err))?;
        let mut profiles = fetch_profiles(self.ctx.store.as_ref(), records.iter().map(|record| record.id.as_str())).await;
        Ok(records
            .iter()
            .filter_map(|record| profiles.remove(&record.id))
            .collect())
    }

    pub async fn fetch_user_list(&self, list: &UserList) -> crate::Result<Vec<User>> {
        match list {
            UserList::Blocked => self.blocked_users().await,
            UserList::Followers(uid) => self.profiles_in(&keys::followers(uid), "followers").await,
            UserList::Following(uid) => self.profiles_in(&keys::following(uid), "following").await,
            UserList::Likes(post_id) => self.profiles_in(&keys::post_likes(post_id), "likes").await,
            UserList::All => self.fetch_users().await,
        }
    }
}

fn decode_users(documents: Vec<StoredDocument>) -> Vec<User> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.id;
            decode::<User>(document.data)
                .inspect_err(|err| warn!("skipping malformed user {id}: {err}"))
                .ok()
        })
        .collect()
}
