//! Playback resources for the posts just ahead of the visible one.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use lru::LruCache;
use url::Url;

use crate::errors::ImmerseError;
use crate::types::Post;

/// Bounded initial buffering applied to every prepared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    pub forward_buffer: Duration,
    /// Bits per second.
    pub peak_bitrate: u64,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            forward_buffer: Duration::from_secs(2),
            peak_bitrate: 2_500_000,
        }
    }
}

/// A video ready to hand to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackResource {
    pub post_id: String,
    pub url: Url,
    pub policy: BufferPolicy,
}

/// Builds playback resources. The player itself lives outside this crate.
pub trait MediaPreparer: Send + Sync {
    fn prepare(&self, post_id: &str, url: &str, policy: BufferPolicy) -> crate::Result<PlaybackResource>;
}

/// Accepts `http`, `https` and `file` URLs and attaches the buffer policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedPreparer;

impl MediaPreparer for BufferedPreparer {
    fn prepare(&self, post_id: &str, url: &str, policy: BufferPolicy) -> crate::Result<PlaybackResource> {
        let parsed = Url::parse(url).map_err(|err| ImmerseError::Resource {
            message: format!("invalid video url `{url}`: {err}").into(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https" | "file") {
            return Err(ImmerseError::Resource {
                message: format!("unsupported scheme `{}` for post {post_id}", parsed.scheme()).into(),
            });
        }
        Ok(PlaybackResource {
            post_id: post_id.to_string(),
            url: parsed,
            policy,
        })
    }
}

/// Outcome of one preload pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Posts prepared during this pass, in window order.
    pub prepared: Vec<String>,
    /// Posts in the window that were already cached.
    pub cached: usize,
    /// Posts in the window whose media is withheld.
    pub skipped: usize,
    pub failed: usize,
}

/// Indices of the posts to preload after `current` in a list of `len` posts.
pub fn window(current: usize, len: usize, lookahead: usize) -> Range<usize> {
    let start = current.saturating_add(1).min(len);
    let end = current.saturating_add(1).saturating_add(lookahead).min(len);
    start..end
}

pub struct PreloadScheduler {
    preparer: Arc<dyn MediaPreparer>,
    policy: BufferPolicy,
    lookahead: usize,
    cache: LruCache<String, PlaybackResource>,
}

impl PreloadScheduler {
    pub fn new(preparer: Arc<dyn MediaPreparer>, policy: BufferPolicy, lookahead: usize, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            preparer,
            policy,
            lookahead,
            cache: LruCache::new(capacity),
        }
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Prepares the posts after `current` that are not cached yet.
    pub fn preload(&mut self, current: usize, posts: &[Post]) -> PreloadReport {
        let mut report = PreloadReport::default();
        for post in &posts[window(current, posts.len(), self.lookahead)] {
            if self.cache.get(&post.id).is_some() {
                report.cached += 1;
                continue;
            }
            let Some(url) = post.playable_url() else {
                report.skipped += 1;
                continue;
            };
            match self.preparer.prepare(&post.id, url, self.policy) {
                Ok(resource) => {
                    self.cache.put(post.id.clone(), resource);
                    report.prepared.push(post.id.clone());
                }
                Err(err) => {
                    warn!("preload of post {} skipped: {err}", post.id);
                    report.failed += 1;
                }
            }
        }
        debug!(
            "preload from {current}: {} prepared, {} cached",
            report.prepared.len(),
            report.cached
        );
        report
    }

    /// The cached resource for `post`, or one built on demand.
    pub fn resource_for(&mut self, post: &Post) -> crate::Result<PlaybackResource> {
        let Some(url) = post.playable_url() else {
            return Err(ImmerseError::Resource {
                message: format!("media of post {} is withheld", post.id).into(),
            });
        };
        if let Some(resource) = self.cache.get(&post.id) {
            return Ok(resource.clone());
        }
        let resource = self.preparer.prepare(&post.id, url, self.policy)?;
        self.cache.put(post.id.clone(), resource.clone());
        Ok(resource)
    }

    pub fn is_cached(&self, post_id: &str) -> bool {
        self.cache.contains(&post_id.to_string())
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
