use log::debug;

use super::ServiceContext;
use super::post::decode_posts;
use super::user::fetch_profiles;
use crate::errors::ImmerseError;
use crate::keys;
use crate::types::Post;

/// Source of the raw feed.
pub struct FeedService {
    ctx: ServiceContext,
}

impl FeedService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Every post in the backend, owners attached, in storage order.
    pub async fn fetch_posts(&self) -> crate::Result<Vec<Post>> {
        let documents = self
            .ctx
            .store
            .list(keys::POSTS)
            .await
            .map_err(|err| ImmerseError::fetch("posts", err))?;
        let mut posts = decode_posts(documents);
        let owners = fetch_profiles(self.ctx.store.as_ref(), posts.iter().map(|post| post.owner_uid.as_str())).await;
        for post in &mut posts {
            post.owner = owners.get(&post.owner_uid).cloned();
        }
        debug!("fetched {} posts from {} owners", posts.len(), owners.len());
        Ok(posts)
    }
}
