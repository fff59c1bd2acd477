//! Media uploads and post publishing.
//!
//! Payload size is checked before object storage is touched; an oversize upload never leaves
//! the client.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::json;

use super::ServiceContext;
use crate::backend::{ObjectStorage, encode, fields};
use crate::config::UploadSettings;
use crate::errors::{ImmerseError, ValidationError};
use crate::id::{generate_document_id, generate_object_name};
use crate::keys;
use crate::session::ProfileUpdate;
use crate::types::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProfileImage,
    PostImage,
    Video,
}

impl UploadKind {
    pub fn folder(self) -> &'static str {
        match self {
            Self::ProfileImage => "profile_images",
            Self::PostImage => "post_images",
            Self::Video => "videos",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::ProfileImage | Self::PostImage => "jpg",
            Self::Video => "mov",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::ProfileImage | Self::PostImage => "image/jpeg",
            Self::Video => "video/quicktime",
        }
    }

    fn limit(self, settings: &UploadSettings) -> u64 {
        match self {
            Self::ProfileImage | Self::PostImage => settings.max_image_bytes,
            Self::Video => settings.max_video_bytes,
        }
    }
}

/// A post about to be published.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub caption: String,
    pub video_url: String,
    /// Encoded still image shown before playback starts.
    pub thumbnail: Option<Vec<u8>>,
}

pub struct UploadService {
    ctx: ServiceContext,
    storage: Arc<dyn ObjectStorage>,
    settings: UploadSettings,
}

impl UploadService {
    pub fn new(ctx: ServiceContext, storage: Arc<dyn ObjectStorage>, settings: UploadSettings) -> Self {
        Self { ctx, storage, settings }
    }

    /// Rejects empty and oversize payloads.
    pub fn check_size(&self, kind: UploadKind, len: usize) -> Result<(), ValidationError> {
        if len == 0 {
            return Err(ValidationError::single("upload", "upload.empty", "nothing to upload"));
        }
        let limit = kind.limit(&self.settings);
        if len as u64 > limit {
            return Err(ValidationError::single(
                "upload",
                "upload.too_large",
                format!("{len} bytes exceeds the {limit} byte limit"),
            ));
        }
        Ok(())
    }

    async fn upload(&self, kind: UploadKind, bytes: Vec<u8>) -> crate::Result<String> {
        self.ctx.session.viewer()?;
        self.check_size(kind, bytes.len())?;
        let key = format!("{}/{}", kind.folder(), generate_object_name(kind.extension()));
        let size = bytes.len();
        let url = self
            .storage
            .put(&key, bytes, kind.content_type())
            .await
            .map_err(|err| ImmerseError::write("upload", err))?;
        debug!("uploaded {size} bytes to {key}");
        Ok(url)
    }

    pub async fn upload_video(&self, bytes: Vec<u8>) -> crate::Result<String> {
        self.upload(UploadKind::Video, bytes).await
    }

    pub async fn upload_image(&self, kind: UploadKind, bytes: Vec<u8>) -> crate::Result<String> {
        if kind == UploadKind::Video {
            return Err(ValidationError::single("upload", "upload.kind", "videos go through upload_video").into());
        }
        self.upload(kind, bytes).await
    }

    /// Writes the post document; a thumbnail that fails to upload leaves the post without one.
    pub async fn upload_post(&self, new_post: NewPost) -> crate::Result<Post> {
        let viewer = self.ctx.session.viewer()?;
        let mut post = Post::new(generate_document_id(), viewer.id, new_post.video_url, new_post.caption);
        let document = encode(&post).map_err(|err| ImmerseError::write("post", err))?;
        self.ctx
            .store
            .set(&keys::post(&post.id), document)
            .await
            .map_err(|err| ImmerseError::write("post", err))?;

        if let Some(thumbnail) = new_post.thumbnail {
            match self.attach_thumbnail(&post.id, thumbnail).await {
                Ok(url) => post.thumbnail_url = url,
                Err(err) => warn!("post {} published without thumbnail: {err}", post.id),
            }
        }
        Ok(post)
    }

    async fn attach_thumbnail(&self, post_id: &str, bytes: Vec<u8>) -> crate::Result<String> {
        let url = self.upload(UploadKind::PostImage, bytes).await?;
        self.ctx
            .store
            .update(&keys::post(post_id), fields([("thumbnailUrl", json!(url))]))
            .await
            .map_err(|err| ImmerseError::write("thumbnail", err))?;
        Ok(url)
    }

    /// Uploads the video and publishes a post pointing at it.
    pub async fn publish_video(
        &self,
        video: Vec<u8>,
        caption: impl Into<String>,
        thumbnail: Option<Vec<u8>>,
    ) -> crate::Result<Post> {
        let video_url = self.upload_video(video).await?;
        self.upload_post(NewPost {
            caption: caption.into(),
            video_url,
            thumbnail,
        })
        .await
    }

    pub async fn update_profile_image(&self, bytes: Vec<u8>) -> crate::Result<String> {
        let url = self.upload(UploadKind::ProfileImage, bytes).await?;
        self.ctx
            .session
            .update_profile(ProfileUpdate {
                profile_image_url: Some(url.clone()),
                ..ProfileUpdate::default()
            })
            .await?;
        Ok(url)
    }
}
