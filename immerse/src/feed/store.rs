//! The in-memory feed list and its optimistic mutations.
//!
//! Every mutation follows the same shape: snapshot the post, apply the change locally, write
//! to the backend, then either adopt the backend's authoritative value or restore the
//! snapshot and return the error.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::errors::ImmerseError;
use crate::rating::{RatingFraction, StarRating};
use crate::services::PostService;
use crate::types::Post;

pub struct PostStore {
    posts: Vec<Post>,
    index: HashMap<String, usize>,
    service: Arc<PostService>,
}

impl PostStore {
    pub fn new(service: Arc<PostService>) -> Self {
        Self {
            posts: Vec::new(),
            index: HashMap::new(),
            service,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.index_of(post_id).map(|i| &self.posts[i])
    }

    pub fn index_of(&self, post_id: &str) -> Option<usize> {
        self.index.get(post_id).copied()
    }

    /// Installs a new list in one step.
    pub fn replace_all(&mut self, posts: Vec<Post>) {
        self.posts = posts;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .posts
            .iter()
            .enumerate()
            .map(|(i, post)| (post.id.clone(), i))
            .collect();
    }

    fn slot(&self, post_id: &str) -> crate::Result<usize> {
        self.index_of(post_id)
            .ok_or_else(|| ImmerseError::not_found("post", post_id))
    }

    fn rollback(&mut self, slot: usize, snapshot: Post, err: ImmerseError) -> ImmerseError {
        warn!("reverting post {}: {err}", snapshot.id);
        self.posts[slot] = snapshot;
        err
    }

    pub async fn apply_like(&mut self, post_id: &str) -> crate::Result<()> {
        let slot = self.slot(post_id)?;
        if self.posts[slot].liked_by_viewer {
            return Ok(());
        }
        let snapshot = self.posts[slot].clone();
        let post = &mut self.posts[slot];
        post.liked_by_viewer = true;
        post.likes += 1;

        match self.service.like_post(post_id).await {
            Ok(likes) => {
                self.posts[slot].likes = likes;
                Ok(())
            }
            Err(err) => Err(self.rollback(slot, snapshot, err)),
        }
    }

    /// No-op when the viewer has not liked the post or it has no likes.
    pub async fn apply_unlike(&mut self, post_id: &str) -> crate::Result<()> {
        let slot = self.slot(post_id)?;
        if !self.posts[slot].liked_by_viewer || self.posts[slot].likes == 0 {
            return Ok(());
        }
        let snapshot = self.posts[slot].clone();
        let post = &mut self.posts[slot];
        post.liked_by_viewer = false;
        post.likes -= 1;

        match self.service.unlike_post(post_id).await {
            Ok(likes) => {
                self.posts[slot].likes = likes;
                Ok(())
            }
            Err(err) => Err(self.rollback(slot, snapshot, err)),
        }
    }

    pub async fn toggle_like(&mut self, post_id: &str) -> crate::Result<()> {
        let slot = self.slot(post_id)?;
        if self.posts[slot].liked_by_viewer {
            self.apply_unlike(post_id).await
        } else {
            self.apply_like(post_id).await
        }
    }

    pub async fn apply_flag(&mut self, post_id: &str) -> crate::Result<()> {
        let slot = self.slot(post_id)?;
        if self.posts[slot].flagged_by_viewer {
            return Ok(());
        }
        let snapshot = self.posts[slot].clone();
        self.posts[slot].flagged_by_viewer = true;

        match self.service.flag_post(post_id, &snapshot.owner_uid).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.rollback(slot, snapshot, err)),
        }
    }

    pub async fn apply_unflag(&mut self, post_id: &str) -> crate::Result<()> {
        let slot = self.slot(post_id)?;
        if !self.posts[slot].flagged_by_viewer {
            return Ok(());
        }
        let snapshot = self.posts[slot].clone();
        self.posts[slot].flagged_by_viewer = false;

        match self.service.unflag_post(post_id).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.rollback(slot, snapshot, err)),
        }
    }

    /// Rates the post. A previous rating by the viewer is replaced, never counted twice.
    ///
    /// Returns the aggregate recomputed by the backend, which also replaces the local guess.
    pub async fn apply_rating(&mut self, post_id: &str, rating: StarRating) -> crate::Result<RatingFraction> {
        let slot = self.slot(post_id)?;
        let snapshot = self.posts[slot].clone();
        let post = &mut self.posts[slot];
        let guess = post.average_rating.replacing(post.viewer_star_rating(), rating);
        post.set_rating_aggregate(guess);
        post.viewer_rating = rating.get();

        match self.service.rate_post(post_id, rating).await {
            Ok(aggregate) => {
                debug!("post {post_id} rated {}; aggregate {aggregate}", rating.get());
                self.posts[slot].set_rating_aggregate(aggregate);
                Ok(aggregate)
            }
            Err(err) => Err(self.rollback(slot, snapshot, err)),
        }
    }

    /// Withdraws the viewer's rating. No-op when there is none.
    pub async fn apply_unrating(&mut self, post_id: &str) -> crate::Result<RatingFraction> {
        let slot = self.slot(post_id)?;
        let Some(previous) = self.posts[slot].viewer_star_rating() else {
            return Ok(self.posts[slot].average_rating);
        };
        let snapshot = self.posts[slot].clone();
        let post = &mut self.posts[slot];
        let guess = post.average_rating.removing(previous);
        post.set_rating_aggregate(guess);
        post.viewer_rating = 0;

        match self.service.remove_rating(post_id).await {
            Ok(aggregate) => {
                self.posts[slot].set_rating_aggregate(aggregate);
                Ok(aggregate)
            }
            Err(err) => Err(self.rollback(slot, snapshot, err)),
        }
    }

    /// Tapping the star the viewer already gave clears the rating; any other star rates.
    pub async fn toggle_rating(&mut self, post_id: &str, rating: StarRating) -> crate::Result<RatingFraction> {
        let slot = self.slot(post_id)?;
        if self.posts[slot].viewer_rating == rating.get() {
            self.apply_unrating(post_id).await
        } else {
            self.apply_rating(post_id, rating).await
        }
    }

    /// Removes the post from the list and deletes it remotely. On failure it goes back to
    /// the position it was taken from.
    pub async fn remove(&mut self, post_id: &str) -> crate::Result<Post> {
        let slot = self.slot(post_id)?;
        let post = self.posts.remove(slot);
        self.reindex();

        match self.service.delete_post(post_id).await {
            Ok(()) => Ok(post),
            Err(err) => {
                warn!("restoring post {post_id} at {slot}: {err}");
                self.posts.insert(slot, post);
                self.reindex();
                Err(err)
            }
        }
    }
}
