//! Post comments and the comment counter they maintain.

use chrono::Utc;
use log::warn;
use serde_json::json;

use super::ServiceContext;
use super::post::PostService;
use super::user::fetch_profiles;
use crate::backend::{StoredDocument, decode, encode, fields};
use crate::errors::{ImmerseError, ValidationError};
use crate::id::generate_document_id;
use crate::keys;
use crate::notify::NotificationEvent;
use crate::types::{Comment, NotificationKind};

const MAX_COMMENT_LEN: usize = 500;

pub struct CommentService {
    ctx: ServiceContext,
    posts: PostService,
}

impl CommentService {
    pub fn new(ctx: ServiceContext) -> Self {
        let posts = PostService::new(ctx.clone());
        Self { ctx, posts }
    }

    /// Adds the viewer's comment and bumps the post's comment count.
    pub async fn upload_comment(&self, post_id: &str, text: &str) -> crate::Result<Comment> {
        let viewer = self.ctx.session.viewer()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::single("commentText", "validation.required", "comment is empty").into());
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(ValidationError::single(
                "commentText",
                "validation.length",
                format!("comments are limited to {MAX_COMMENT_LEN} characters"),
            )
            .into());
        }
        let post = self.posts.fetch_post(post_id).await?;
        let comment = Comment {
            id: generate_document_id(),
            post_id: post.id.clone(),
            post_owner_uid: post.owner_uid.clone(),
            comment_owner_uid: viewer.id.clone(),
            comment_text: text.to_string(),
            timestamp: Utc::now(),
            user: None,
        };
        let document = encode(&comment).map_err(|err| ImmerseError::write("comment", err))?;
        let path = format!("{}/{}", keys::post_comments(post_id), comment.id);
        self.ctx
            .store
            .set(&path, document)
            .await
            .map_err(|err| ImmerseError::write("comment", err))?;
        self.write_comment_count(post_id, post.comment_count + 1).await;

        self.ctx
            .notify(NotificationEvent::new(&post.owner_uid, &viewer.id, NotificationKind::Comment).with_post(post_id))
            .await;
        Ok(comment)
    }

    /// Comments on a post, oldest first, authors attached.
    pub async fn fetch_comments(&self, post_id: &str) -> crate::Result<Vec<Comment>> {
        let documents = self
            .ctx
            .store
            .list(&keys::post_comments(post_id))
            .await
            .map_err(|err| ImmerseError::fetch("comments", err))?;
        let mut comments = decode_comments(documents);
        comments.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let authors = fetch_profiles(
            self.ctx.store.as_ref(),
            comments.iter().map(|comment| comment.comment_owner_uid.as_str()),
        )
        .await;
        for comment in &mut comments {
            comment.user = authors.get(&comment.comment_owner_uid).cloned();
        }
        Ok(comments)
    }

    /// Deletes one of the viewer's own comments.
    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> crate::Result<()> {
        let viewer = self.ctx.session.viewer()?;
        let path = format!("{}/{comment_id}", keys::post_comments(post_id));
        let document = self
            .ctx
            .store
            .get(&path)
            .await
            .map_err(|err| ImmerseError::fetch("comment", err))?
            .ok_or_else(|| ImmerseError::not_found("comment", comment_id))?;
        let comment: Comment = decode(document).map_err(|err| ImmerseError::fetch("comment", err))?;
        if comment.comment_owner_uid != viewer.id {
            return Err(ImmerseError::NotPermitted {
                message: "only the author can delete a comment".into(),
            });
        }
        self.ctx
            .store
            .delete(&path)
            .await
            .map_err(|err| ImmerseError::write("comment", err))?;
        let post = self.posts.fetch_post(post_id).await?;
        self.write_comment_count(post_id, post.comment_count.saturating_sub(1)).await;
        Ok(())
    }

    // The comment itself is the source of truth; a stale counter is only logged.
    async fn write_comment_count(&self, post_id: &str, count: u64) {
        if let Err(err) = self
            .ctx
            .store
            .update(&keys::post(post_id), fields([("commentCount", json!(count))]))
            .await
        {
            warn!("failed to update comment count of post {post_id}: {err}");
        }
    }
}

fn decode_comments(documents: Vec<StoredDocument>) -> Vec<Comment> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.id;
            decode::<Comment>(document.data)
                .inspect_err(|err| warn!("skipping malformed comment {id}: {err}"))
                .ok()
        })
        .collect()
}
