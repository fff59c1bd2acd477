//! Fetches, shuffles and annotates the feed, and publishes its loading state.

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use tokio::sync::watch;

use super::annotator::{AnnotationReport, Annotator};
use super::preload::{PlaybackResource, PreloadReport, PreloadScheduler};
use super::store::PostStore;
use crate::errors::ImmerseError;
use crate::services::FeedService;
use crate::types::Post;

/// What observers of the feed see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedState {
    pub loading: bool,
    pub empty: bool,
    pub error: Option<String>,
    pub len: usize,
    /// Bumped every time a new list is published.
    pub generation: u64,
}

/// Marks the feed as loading for as long as it lives. Dropping it without a verdict (the
/// load future was cancelled) only clears the flag.
struct Loading<'a> {
    state: &'a watch::Sender<FeedState>,
    settled: bool,
}

impl<'a> Loading<'a> {
    fn start(state: &'a watch::Sender<FeedState>) -> Self {
        state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        Self { state, settled: false }
    }

    fn published(mut self, len: usize) {
        self.settled = true;
        self.state.send_modify(|state| {
            state.loading = false;
            state.len = len;
            state.empty = len == 0;
            state.generation += 1;
        });
    }

    fn failed(mut self, err: &ImmerseError) {
        self.settled = true;
        self.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(err.to_string());
        });
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.send_modify(|state| state.loading = false);
        }
    }
}

pub struct FeedController {
    feed: FeedService,
    annotator: Annotator,
    store: PostStore,
    preloader: PreloadScheduler,
    state: watch::Sender<FeedState>,
}

impl FeedController {
    pub fn new(feed: FeedService, annotator: Annotator, store: PostStore, preloader: PreloadScheduler) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            feed,
            annotator,
            store,
            preloader,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn posts(&self) -> &[Post] {
        self.store.posts()
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    /// Direct access for the optimistic like, flag and rating mutations.
    pub fn store_mut(&mut self) -> &mut PostStore {
        &mut self.store
    }

    /// Loads the feed. A controller that already holds posts re-annotates them in place of
    /// fetching again.
    pub async fn fetch_feed(&mut self) -> crate::Result<&[Post]> {
        if self.store.is_empty() {
            return self.refresh().await;
        }
        let loading = Loading::start(&self.state);
        let mut posts = self.store.posts().to_vec();
        match self.annotator.annotate(&mut posts).await {
            Ok(report) => {
                log_report(&report);
                self.store.replace_all(posts);
                loading.published(self.store.len());
                Ok(self.store.posts())
            }
            Err(err) => {
                loading.failed(&err);
                Err(err)
            }
        }
    }

    /// Refetches, shuffles and annotates. The previous list stays in place until the new
    /// one is ready, and is kept if anything fails.
    pub async fn refresh(&mut self) -> crate::Result<&[Post]> {
        let loading = Loading::start(&self.state);
        let mut posts = match self.feed.fetch_posts().await {
            Ok(posts) => posts,
            Err(err) => {
                warn!("feed fetch failed, keeping {} posts: {err}", self.store.len());
                loading.failed(&err);
                return Err(err);
            }
        };
        posts.shuffle(&mut rand::thread_rng());

        match self.annotator.annotate(&mut posts).await {
            Ok(report) => {
                log_report(&report);
                self.store.replace_all(posts);
                loading.published(self.store.len());
                info!("feed published with {} posts", self.store.len());
                Ok(self.store.posts())
            }
            Err(err) => {
                warn!("feed annotation failed, keeping previous list: {err}");
                loading.failed(&err);
                Err(err)
            }
        }
    }

    /// Removes a post from the feed and the backend.
    pub async fn remove(&mut self, post_id: &str) -> crate::Result<Post> {
        let removed = self.store.remove(post_id).await?;
        let len = self.store.len();
        self.state.send_modify(|state| {
            state.len = len;
            state.empty = len == 0;
        });
        Ok(removed)
    }

    pub fn preload_from(&mut self, current: usize) -> PreloadReport {
        self.preloader.preload(current, self.store.posts())
    }

    /// The resource to play `post_id` with, preloaded when possible.
    pub fn playback_for(&mut self, post_id: &str) -> crate::Result<PlaybackResource> {
        let post = self
            .store
            .get(post_id)
            .ok_or_else(|| ImmerseError::not_found("post", post_id))?;
        self.preloader.resource_for(post)
    }

    pub fn preloader(&self) -> &PreloadScheduler {
        &self.preloader
    }
}

fn log_report(report: &AnnotationReport) {
    debug!(
        "annotated {} posts ({} failed reads, {} withheld)",
        report.annotated, report.failed_reads, report.withheld
    );
}
