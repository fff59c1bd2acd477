//! Post reads and the per-viewer relationship writes: likes, flags and ratings.

use log::{debug, warn};
use serde_json::{Value, json};

use super::ServiceContext;
use super::user::fetch_profiles;
use crate::backend::{Document, StoredDocument, decode, fields, marker};
use crate::errors::ImmerseError;
use crate::keys;
use crate::notify::NotificationEvent;
use crate::rating::{RatingFraction, StarRating};
use crate::types::{NotificationKind, Post, User};

/// Decodes post documents, skipping (and logging) the ones that do not parse.
pub(crate) fn decode_posts(documents: Vec<StoredDocument>) -> Vec<Post> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.id;
            decode::<Post>(document.data)
                .inspect_err(|err| warn!("skipping malformed post {id}: {err}"))
                .ok()
        })
        .collect()
}

pub struct PostService {
    ctx: ServiceContext,
}

impl PostService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn fetch_post(&self, post_id: &str) -> crate::Result<Post> {
        let document = self
            .ctx
            .store
            .get(&keys::post(post_id))
            .await
            .map_err(|err| ImmerseError::fetch("post", err))?
            .ok_or_else(|| ImmerseError::not_found("post", post_id))?;
        decode(document).map_err(|err| ImmerseError::fetch("post", err))
    }

    /// Posts owned by `user`, newest first, with the owner attached.
    pub async fn fetch_user_posts(&self, user: &User) -> crate::Result<Vec<Post>> {
        let documents = self
            .ctx
            .store
            .find_eq(keys::POSTS, "ownerUid", &json!(user.id))
            .await
            .map_err(|err| ImmerseError::fetch("user posts", err))?;
        let mut posts = decode_posts(documents);
        for post in &mut posts {
            post.owner = Some(user.clone());
        }
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(posts)
    }

    /// Posts `user_id` has liked, resolved through the viewer-side mirror records.
    pub async fn fetch_liked_posts(&self, user_id: &str) -> crate::Result<Vec<Post>> {
        let likes = self
            .ctx
            .store
            .list(&keys::user_likes(user_id))
            .await
            .map_err(|err| ImmerseError::fetch("liked posts", err))?;
        let mut posts = Vec::with_capacity(likes.len());
        for like in likes {
            match self.fetch_post(&like.id).await {
                Ok(post) => posts.push(post),
                Err(err) => warn!("skipping liked post {}: {err}", like.id),
            }
        }
        let owners = fetch_profiles(self.ctx.store.as_ref(), posts.iter().map(|post| post.owner_uid.as_str())).await;
        for post in &mut posts {
            post.owner = owners.get(&post.owner_uid).cloned();
        }
        Ok(posts)
    }

    async fn undo(&self, path: &str) {
        if let Err(err) = self.ctx.store.delete(path).await {
            warn!("failed to undo write at {path}: {err}");
        }
    }

    async fn redo(&self, path: &str) {
        if let Err(err) = self.ctx.store.set(path, marker()).await {
            warn!("failed to restore record at {path}: {err}");
        }
    }

    async fn write_like_count(&self, post_id: &str, likes: u64) -> crate::Result<()> {
        self.ctx
            .store
            .update(&keys::post(post_id), fields([("likes", json!(likes))]))
            .await
            .map_err(|err| ImmerseError::write("like count", err))
    }

    /// Records the viewer's like and returns the post's new like count.
    ///
    /// Liking an already liked post changes nothing.
    pub async fn like_post(&self, post_id: &str) -> crate::Result<u64> {
        let viewer = self.ctx.session.viewer()?;
        let post = self.fetch_post(post_id).await?;
        let like = keys::post_like(post_id, &viewer.id);
        let mirror = keys::user_like(&viewer.id, post_id);
        let store = &self.ctx.store;

        if store.exists(&like).await.map_err(|err| ImmerseError::fetch("like", err))? {
            return Ok(post.likes);
        }
        store
            .set(&like, marker())
            .await
            .map_err(|err| ImmerseError::write("like", err))?;
        if let Err(err) = store.set(&mirror, marker()).await {
            self.undo(&like).await;
            return Err(ImmerseError::write("like", err));
        }
        let likes = post.likes + 1;
        if let Err(err) = self.write_like_count(post_id, likes).await {
            self.undo(&like).await;
            self.undo(&mirror).await;
            return Err(err);
        }

        self.ctx
            .notify(NotificationEvent::new(&post.owner_uid, &viewer.id, NotificationKind::Like).with_post(post_id))
            .await;
        Ok(likes)
    }

    /// Removes the viewer's like and returns the post's new like count.
    pub async fn unlike_post(&self, post_id: &str) -> crate::Result<u64> {
        let viewer = self.ctx.session.viewer()?;
        let post = self.fetch_post(post_id).await?;
        if post.likes == 0 {
            return Ok(0);
        }
        let like = keys::post_like(post_id, &viewer.id);
        let mirror = keys::user_like(&viewer.id, post_id);
        let store = &self.ctx.store;

        if !store.exists(&like).await.map_err(|err| ImmerseError::fetch("like", err))? {
            return Ok(post.likes);
        }
        store
            .delete(&like)
            .await
            .map_err(|err| ImmerseError::write("unlike", err))?;
        if let Err(err) = store.delete(&mirror).await {
            self.redo(&like).await;
            return Err(ImmerseError::write("unlike", err));
        }
        let likes = post.likes - 1;
        if let Err(err) = self.write_like_count(post_id, likes).await {
            self.redo(&like).await;
            self.redo(&mirror).await;
            return Err(err);
        }

        self.ctx
            .retract(NotificationEvent::new(&post.owner_uid, &viewer.id, NotificationKind::Like).with_post(post_id))
            .await;
        Ok(likes)
    }

    pub async fn has_liked(&self, post_id: &str) -> crate::Result<bool> {
        let viewer = self.ctx.session.viewer()?;
        self.liked_by(&viewer.id, post_id).await
    }

    pub async fn liked_by(&self, viewer_id: &str, post_id: &str) -> crate::Result<bool> {
        self.ctx
            .store
            .exists(&keys::user_like(viewer_id, post_id))
            .await
            .map_err(|err| ImmerseError::fetch("like", err))
    }

    pub async fn flag_post(&self, post_id: &str, owner_uid: &str) -> crate::Result<()> {
        let viewer = self.ctx.session.viewer()?;
        let store = &self.ctx.store;
        store
            .merge(&keys::flag(post_id), fields([("flaggedUid", json!(owner_uid))]))
            .await
            .map_err(|err| ImmerseError::write("flag", err))?;
        store
            .set(&keys::flagger(post_id, &viewer.id), fields([("flagged", json!(true))]))
            .await
            .map_err(|err| ImmerseError::write("flag", err))
    }

    pub async fn unflag_post(&self, post_id: &str) -> crate::Result<()> {
        let viewer = self.ctx.session.viewer()?;
        self.ctx
            .store
            .delete(&keys::flagger(post_id, &viewer.id))
            .await
            .map_err(|err| ImmerseError::write("unflag", err))
    }

    pub async fn is_flagged(&self, post_id: &str) -> crate::Result<bool> {
        let viewer = self.ctx.session.viewer()?;
        self.flagged_by(&viewer.id, post_id).await
    }

    pub async fn flagged_by(&self, viewer_id: &str, post_id: &str) -> crate::Result<bool> {
        self.ctx
            .store
            .exists(&keys::flagger(post_id, viewer_id))
            .await
            .map_err(|err| ImmerseError::fetch("flag", err))
    }

    /// Stores the viewer's rating and returns the recomputed aggregate.
    ///
    /// If the aggregate cannot be rebuilt the viewer's previous record is put back, so the
    /// stored ratings and the stored aggregate keep agreeing.
    pub async fn rate_post(&self, post_id: &str, rating: StarRating) -> crate::Result<RatingFraction> {
        let viewer = self.ctx.session.viewer()?;
        let path = keys::star_rating(post_id, &viewer.id);
        let previous = self.rating_record(&path).await?;
        self.ctx
            .store
            .set(&path, fields([("rating", json!(rating.encode()))]))
            .await
            .map_err(|err| ImmerseError::write("rating", err))?;
        match self.recompute_rating(post_id).await {
            Ok(aggregate) => Ok(aggregate),
            Err(err) => {
                self.restore_rating(&path, previous).await;
                Err(err)
            }
        }
    }

    /// Deletes the viewer's rating and returns the recomputed aggregate.
    pub async fn remove_rating(&self, post_id: &str) -> crate::Result<RatingFraction> {
        let viewer = self.ctx.session.viewer()?;
        let path = keys::star_rating(post_id, &viewer.id);
        let previous = self.rating_record(&path).await?;
        self.ctx
            .store
            .delete(&path)
            .await
            .map_err(|err| ImmerseError::write("rating", err))?;
        match self.recompute_rating(post_id).await {
            Ok(aggregate) => Ok(aggregate),
            Err(err) => {
                self.restore_rating(&path, previous).await;
                Err(err)
            }
        }
    }

    async fn rating_record(&self, path: &str) -> crate::Result<Option<Document>> {
        self.ctx
            .store
            .get(path)
            .await
            .map_err(|err| ImmerseError::fetch("rating", err))
    }

    async fn restore_rating(&self, path: &str, previous: Option<Document>) {
        let restored = match previous {
            Some(record) => self.ctx.store.set(path, record).await,
            None => self.ctx.store.delete(path).await,
        };
        if let Err(err) = restored {
            warn!("failed to restore rating at {path}: {err}");
        }
    }

    /// Rebuilds the post's aggregate from every individual rating record and stores it.
    pub async fn recompute_rating(&self, post_id: &str) -> crate::Result<RatingFraction> {
        let records = self
            .ctx
            .store
            .list(&keys::star_ratings(post_id))
            .await
            .map_err(|err| ImmerseError::fetch("ratings", err))?;
        let aggregate = RatingFraction::from_ratings(records.iter().filter_map(|record| {
            record
                .data
                .get("rating")
                .and_then(Value::as_str)
                .and_then(StarRating::decode)
        }));
        debug!("post {post_id} rating aggregate is now {aggregate}");
        self.ctx
            .store
            .update(
                &keys::post(post_id),
                fields([
                    ("averageRating", json!(aggregate.to_string())),
                    ("ratings", json!(aggregate.count())),
                ]),
            )
            .await
            .map_err(|err| ImmerseError::write("rating aggregate", err))?;
        Ok(aggregate)
    }

    /// The viewer's rating of the post, 0 when unrated.
    pub async fn viewer_rating(&self, post_id: &str) -> crate::Result<u8> {
        let viewer = self.ctx.session.viewer()?;
        self.rating_by(&viewer.id, post_id).await
    }

    pub async fn rating_by(&self, viewer_id: &str, post_id: &str) -> crate::Result<u8> {
        let record = self.rating_record(&keys::star_rating(post_id, viewer_id)).await?;
        Ok(record
            .as_ref()
            .and_then(|record| record.get("rating"))
            .and_then(Value::as_str)
            .and_then(StarRating::decode)
            .map_or(0, StarRating::get))
    }

    /// Overwrites the post's aggregate fields with the stored values.
    pub async fn refresh_rating(&self, post: &mut Post) -> crate::Result<()> {
        let stored = self.fetch_post(&post.id).await?;
        post.set_rating_aggregate(stored.average_rating);
        Ok(())
    }

    /// Deletes a post. Only its owner may do so.
    pub async fn delete_post(&self, post_id: &str) -> crate::Result<()> {
        let viewer = self.ctx.session.viewer()?;
        let post = self.fetch_post(post_id).await?;
        if post.owner_uid != viewer.id {
            return Err(ImmerseError::NotPermitted {
                message: format!("post {post_id} belongs to another user").into(),
            });
        }
        self.ctx
            .store
            .delete(&keys::post(post_id))
            .await
            .map_err(|err| ImmerseError::write("post", err))
    }
}
