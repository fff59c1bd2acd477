//! Document models shared by the services and the feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rating::{RatingFraction, StarRating};

/// A short-video post.
///
/// Persisted fields use the backend's camelCase names. The `viewer`-prefixed fields are
/// derived per session by the annotator and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub video_url: String,
    pub owner_uid: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub save_count: u64,
    #[serde(default)]
    pub share_count: u64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub thumbnail_url: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub average_rating: RatingFraction,
    #[serde(default)]
    pub ratings: u32,

    #[serde(skip)]
    pub owner: Option<User>,
    #[serde(skip)]
    pub liked_by_viewer: bool,
    #[serde(skip)]
    pub flagged_by_viewer: bool,
    #[serde(skip)]
    pub viewer_rating: u8,
    #[serde(skip)]
    pub owner_blocked_by_viewer: bool,
    /// Masks the media from playback without touching the stored URLs.
    #[serde(skip)]
    pub media_withheld: bool,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        owner_uid: impl Into<String>,
        video_url: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            video_url: video_url.into(),
            owner_uid: owner_uid.into(),
            caption: caption.into(),
            likes: 0,
            comment_count: 0,
            save_count: 0,
            share_count: 0,
            views: 0,
            thumbnail_url: String::new(),
            timestamp: Utc::now(),
            average_rating: RatingFraction::EMPTY,
            ratings: 0,
            owner: None,
            liked_by_viewer: false,
            flagged_by_viewer: false,
            viewer_rating: 0,
            owner_blocked_by_viewer: false,
            media_withheld: false,
        }
    }

    /// The URL playback may use, or `None` when the media is withheld.
    pub fn playable_url(&self) -> Option<&str> {
        if self.media_withheld || self.owner_blocked_by_viewer || self.video_url.is_empty() {
            None
        } else {
            Some(&self.video_url)
        }
    }

    /// The thumbnail a grid may show, masked the same way as the video.
    pub fn visible_thumbnail(&self) -> Option<&str> {
        if self.media_withheld || self.owner_blocked_by_viewer || self.thumbnail_url.is_empty() {
            None
        } else {
            Some(&self.thumbnail_url)
        }
    }

    /// Masks the post's media until the next annotation says otherwise.
    pub fn withhold_media(&mut self) {
        self.media_withheld = true;
    }

    pub fn viewer_star_rating(&self) -> Option<StarRating> {
        StarRating::new(self.viewer_rating).ok()
    }

    pub fn set_rating_aggregate(&mut self, aggregate: RatingFraction) {
        self.average_rating = aggregate;
        self.ratings = aggregate.count();
    }

    /// Resets everything the annotator derives.
    pub fn clear_viewer_state(&mut self) {
        self.liked_by_viewer = false;
        self.flagged_by_viewer = false;
        self.viewer_rating = 0;
        self.owner_blocked_by_viewer = false;
        self.media_withheld = false;
    }
}

/// A user profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,

    #[serde(skip)]
    pub is_followed: bool,
    #[serde(skip)]
    pub stats: UserStats,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        fullname: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            fullname: fullname.into(),
            bio: None,
            profile_image_url: None,
            is_followed: false,
            stats: UserStats::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub following: u64,
    pub followers: u64,
    pub likes: u64,
    pub posts: u64,
}

/// The authenticated viewer as reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

/// A comment left on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub post_owner_uid: String,
    pub comment_owner_uid: String,
    pub comment_text: String,
    pub timestamp: DateTime<Utc>,

    #[serde(skip)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
}

impl NotificationKind {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Like => "liked one of your posts.",
            Self::Comment => "commented on one of your posts.",
            Self::Follow => "started following you.",
        }
    }
}

/// Activity addressed to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    pub timestamp: DateTime<Utc>,

    #[serde(skip)]
    pub actor: Option<User>,
}
