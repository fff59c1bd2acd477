pub(crate) use std::sync::Arc;

pub(crate) use chrono::{Duration, TimeZone, Utc};
pub(crate) use immerse::backend::{DocumentStore, MemoryAuth, MemoryObjectStorage, MemoryStore, encode, marker};
pub(crate) use immerse::config::ImmerseConfig;
pub(crate) use immerse::feed::BlockCheckPolicy;
pub(crate) use immerse::{CurrentUser, Immerse, ImmerseError, Post, RatingFraction, StarRating, User, keys};

pub(crate) const VIEWER: &str = "viewer";

/// In-memory collaborators plus a client wired to them.
pub(crate) struct Harness {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) auth: Arc<MemoryAuth>,
    pub(crate) storage: Arc<MemoryObjectStorage>,
    pub(crate) immerse: Immerse,
}

impl Harness {
    pub(crate) fn signed_in(viewer: &str) -> Self {
        Self::with_config(Some(viewer), ImmerseConfig::default())
    }

    pub(crate) fn signed_out() -> Self {
        Self::with_config(None, ImmerseConfig::default())
    }

    pub(crate) fn with_config(viewer: Option<&str>, config: ImmerseConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(match viewer {
            Some(uid) => MemoryAuth::signed_in(uid),
            None => MemoryAuth::new(),
        });
        let storage = Arc::new(MemoryObjectStorage::new("https://media.example"));
        let immerse = Immerse::new(config, store.clone(), auth.clone(), storage.clone());
        Self {
            store,
            auth,
            storage,
            immerse,
        }
    }

    pub(crate) fn sign_in_as(&self, uid: &str) {
        self.auth.set_current(Some(CurrentUser::new(uid)));
    }

    pub(crate) async fn seed_user(&self, uid: &str, username: &str) -> User {
        let user = User::new(uid, username, format!("{username}@example.com"), username.to_uppercase());
        self.store
            .set(&keys::user(uid), encode(&user).expect("encode user"))
            .await
            .expect("seed user");
        user
    }

    /// Posts get increasing timestamps in seeding order.
    pub(crate) async fn seed_post(&self, id: &str, owner: &str, likes: u64) -> Post {
        let mut post = Post::new(id, owner, format!("https://cdn.example/{id}.mov"), format!("caption {id}"));
        post.likes = likes;
        post.thumbnail_url = format!("https://cdn.example/{id}.jpg");
        let offset = self.store.list(keys::POSTS).await.expect("count posts").len() as i64;
        post.timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(offset);
        self.store
            .set(&keys::post(id), encode(&post).expect("encode post"))
            .await
            .expect("seed post");
        post
    }

    pub(crate) async fn seed_block(&self, viewer: &str, target: &str) {
        self.store
            .set(&keys::blocked_user(viewer, target), marker())
            .await
            .expect("seed block");
    }

    pub(crate) async fn stored_post(&self, id: &str) -> Post {
        self.immerse.posts().fetch_post(id).await.expect("stored post")
    }

    pub(crate) async fn has_path(&self, path: &str) -> bool {
        self.store.exists(path).await.expect("exists")
    }
}

pub(crate) fn stars(value: u8) -> StarRating {
    StarRating::new(value).expect("valid rating")
}

pub(crate) fn fraction(raw: &str) -> RatingFraction {
    raw.parse().expect("valid fraction")
}

pub(crate) fn fail_closed() -> ImmerseConfig {
    let mut config = ImmerseConfig::default();
    config.feed.block_check = BlockCheckPolicy::FailClosed;
    config
}

pub(crate) fn fail_open() -> ImmerseConfig {
    let mut config = ImmerseConfig::default();
    config.feed.block_check = BlockCheckPolicy::FailOpen;
    config
}
