//! Client entry point wiring the collaborators into the services and the feed.
//!
//! # Example
//! ```ignore
//! let config = ImmerseConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?;
//! let immerse = Immerse::connect(config, auth, storage).await?;
//!
//! let mut feed = immerse.feed();
//! feed.refresh().await?;
//! feed.preload_from(0);
//! feed.store_mut().apply_like(&post_id).await?;
//! ```

use std::sync::Arc;

use crate::backend::{AuthProvider, DocumentStore, ObjectStorage, RedisStore};
use crate::config::ImmerseConfig;
use crate::errors::ImmerseError;
use crate::feed::{Annotator, BufferedPreparer, FeedController, MediaPreparer, PostStore, PreloadScheduler};
use crate::notify::{Notifier, StoreNotifier};
use crate::services::{
    CommentService, FeedService, NotificationService, PostService, ServiceContext, UploadService, UserService,
};
use crate::session::Session;

/// Handle on a configured immerse client.
#[derive(Clone)]
pub struct Immerse {
    config: ImmerseConfig,
    ctx: ServiceContext,
    storage: Arc<dyn ObjectStorage>,
    posts: Arc<PostService>,
    users: Arc<UserService>,
}

impl Immerse {
    /// Wires the collaborators together; notifications are written to `store`.
    pub fn new(
        config: ImmerseConfig,
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let notifier = Arc::new(StoreNotifier::new(Arc::clone(&store)));
        Self::with_notifier(config, store, auth, storage, notifier)
    }

    pub fn with_notifier(
        config: ImmerseConfig,
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn ObjectStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session = Arc::new(Session::new(auth, Arc::clone(&store), config.registration.clone()));
        let ctx = ServiceContext::new(store, session, notifier);
        Self {
            posts: Arc::new(PostService::new(ctx.clone())),
            users: Arc::new(UserService::new(ctx.clone())),
            config,
            ctx,
            storage,
        }
    }

    /// Opens the Redis document store named by the configuration.
    pub async fn connect(
        config: ImmerseConfig,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn ObjectStorage>,
    ) -> crate::Result<Self> {
        let url = config.redis_url()?;
        let store = RedisStore::connect(&url, config.redis.prefix.clone())
            .await
            .map_err(|err| ImmerseError::fetch("redis connection", err.into()))?;
        Ok(Self::new(config, Arc::new(store), auth, storage))
    }

    pub fn config(&self) -> &ImmerseConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.ctx.store
    }

    pub fn session(&self) -> &Session {
        &self.ctx.session
    }

    pub fn posts(&self) -> &PostService {
        &self.posts
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn comments(&self) -> CommentService {
        CommentService::new(self.ctx.clone())
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.ctx.clone())
    }

    pub fn uploads(&self) -> UploadService {
        UploadService::new(self.ctx.clone(), Arc::clone(&self.storage), self.config.upload.clone())
    }

    /// A feed controller preparing media with [`BufferedPreparer`].
    pub fn feed(&self) -> FeedController {
        self.feed_with_preparer(Arc::new(BufferedPreparer))
    }

    pub fn feed_with_preparer(&self, preparer: Arc<dyn MediaPreparer>) -> FeedController {
        let settings = &self.config.feed;
        let annotator = Annotator::new(
            Arc::clone(&self.ctx.session),
            Arc::clone(&self.posts),
            Arc::clone(&self.users),
            settings.block_check,
        );
        let preloader = PreloadScheduler::new(
            preparer,
            settings.buffer_policy(),
            settings.lookahead,
            settings.preload_cache_capacity,
        );
        FeedController::new(
            FeedService::new(self.ctx.clone()),
            annotator,
            PostStore::new(Arc::clone(&self.posts)),
            preloader,
        )
    }
}
