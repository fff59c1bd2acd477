//! Document path construction.
//!
//! Paths alternate collection and document segments separated by `/`, e.g.
//! `posts/{post}/post-likes/{viewer}`. Backends map them onto their own key space.

pub const POSTS: &str = "posts";
pub const USERS: &str = "users";
pub const FLAGS: &str = "flags";

pub const POST_LIKES: &str = "post-likes";
pub const USER_LIKES: &str = "user-likes";
pub const STAR_RATINGS: &str = "star-ratings";
pub const FLAGGERS: &str = "flaggers";
pub const BLOCKED_USERS: &str = "blocked-users";
pub const USER_FOLLOWING: &str = "user-following";
pub const USER_FOLLOWERS: &str = "user-followers";
pub const POST_COMMENTS: &str = "post-comments";
pub const USER_NOTIFICATIONS: &str = "user-notifications";

pub fn post(post_id: &str) -> String {
    format!("{POSTS}/{post_id}")
}

pub fn user(user_id: &str) -> String {
    format!("{USERS}/{user_id}")
}

pub fn post_likes(post_id: &str) -> String {
    format!("{POSTS}/{post_id}/{POST_LIKES}")
}

pub fn post_like(post_id: &str, viewer_id: &str) -> String {
    format!("{}/{viewer_id}", post_likes(post_id))
}

pub fn user_likes(viewer_id: &str) -> String {
    format!("{USERS}/{viewer_id}/{USER_LIKES}")
}

pub fn user_like(viewer_id: &str, post_id: &str) -> String {
    format!("{}/{post_id}", user_likes(viewer_id))
}

pub fn star_ratings(post_id: &str) -> String {
    format!("{POSTS}/{post_id}/{STAR_RATINGS}")
}

pub fn star_rating(post_id: &str, viewer_id: &str) -> String {
    format!("{}/{viewer_id}", star_ratings(post_id))
}

pub fn flag(post_id: &str) -> String {
    format!("{FLAGS}/{post_id}")
}

pub fn flagger(post_id: &str, viewer_id: &str) -> String {
    format!("{FLAGS}/{post_id}/{FLAGGERS}/{viewer_id}")
}

pub fn blocked_users(viewer_id: &str) -> String {
    format!("{USERS}/{viewer_id}/{BLOCKED_USERS}")
}

pub fn blocked_user(viewer_id: &str, target_id: &str) -> String {
    format!("{}/{target_id}", blocked_users(viewer_id))
}

pub fn following(user_id: &str) -> String {
    format!("{USERS}/{user_id}/{USER_FOLLOWING}")
}

pub fn followed(user_id: &str, target_id: &str) -> String {
    format!("{}/{target_id}", following(user_id))
}

pub fn followers(user_id: &str) -> String {
    format!("{USERS}/{user_id}/{USER_FOLLOWERS}")
}

pub fn follower(user_id: &str, follower_id: &str) -> String {
    format!("{}/{follower_id}", followers(user_id))
}

pub fn post_comments(post_id: &str) -> String {
    format!("{POSTS}/{post_id}/{POST_COMMENTS}")
}

pub fn notifications(user_id: &str) -> String {
    format!("{USERS}/{user_id}/{USER_NOTIFICATIONS}")
}

/// Last segment of a document path.
pub fn document_id(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Maps document paths onto Redis keys under a namespace prefix.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    pub fn document(&self, path: &str) -> String {
        format!("{}:{}", self.prefix, path.replace('/', ":"))
    }

    /// SCAN pattern matching every key below a collection, nested subcollections included.
    pub fn collection_pattern(&self, collection: &str) -> String {
        format!("{}:*", self.document(collection))
    }

    /// Returns the document id when `key` names a document directly inside `collection`.
    pub fn direct_child<'k>(&self, collection: &str, key: &'k str) -> Option<&'k str> {
        let parent = self.document(collection);
        let rest = key.strip_prefix(parent.as_str())?.strip_prefix(':')?;
        if rest.is_empty() || rest.contains(':') {
            None
        } else {
            Some(rest)
        }
    }
}
