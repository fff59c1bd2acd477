//! immerse core library.
//!
//! Client-side core of a short-video feed: the feed reconciliation and preload routine, the
//! per-viewer relationship services around it, and the backend contracts they talk to.

pub mod backend;
pub mod client;
pub mod config;
pub mod errors;
pub mod feed;
pub mod id;
pub mod keys;
pub mod notify;
pub mod rating;
pub mod services;
pub mod session;
pub mod types;

pub use client::Immerse;
pub use config::{DEFAULT_CONFIG_FILE, ImmerseConfig};
pub use errors::*;
pub use feed::{
    AnnotationReport, BlockCheckPolicy, BufferPolicy, FeedController, FeedState, PlaybackResource, PostStore,
    PreloadScheduler,
};
pub use notify::{NotificationEvent, Notifier, StoreNotifier};
pub use rating::{RatingFraction, StarRating};
pub use session::{ProfileUpdate, Registration, Session};
pub use types::{Comment, CurrentUser, Notification, NotificationKind, Post, User, UserStats};

// Re-export redis so callers do not need to pin a matching version.
pub use redis;
