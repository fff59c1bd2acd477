//! Per-viewer status for each post in a batch.
//!
//! One task per post is spawned on a [`JoinSet`]; each task resolves its four facts
//! concurrently. Nothing is written to the posts until every task has finished, and the
//! results are committed by list position so completion order never leaks into the output.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::errors::ImmerseError;
use crate::services::{PostService, UserService};
use crate::session::Session;
use crate::types::Post;

/// What to assume about a post's owner when the block lookup fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCheckPolicy {
    /// Treat the owner as not blocked.
    FailOpen,
    /// Treat the owner as blocked and withhold the post's media.
    #[default]
    FailClosed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    pub annotated: usize,
    pub failed_reads: usize,
    pub withheld: usize,
}

#[derive(Debug)]
struct ViewerFacts {
    liked: bool,
    flagged: bool,
    rating: u8,
    owner_blocked: bool,
    failed_reads: usize,
}

pub struct Annotator {
    session: Arc<Session>,
    posts: Arc<PostService>,
    users: Arc<UserService>,
    policy: BlockCheckPolicy,
}

impl Annotator {
    pub fn new(
        session: Arc<Session>,
        posts: Arc<PostService>,
        users: Arc<UserService>,
        policy: BlockCheckPolicy,
    ) -> Self {
        Self {
            session,
            posts,
            users,
            policy,
        }
    }

    pub fn policy(&self) -> BlockCheckPolicy {
        self.policy
    }

    /// Resolves liked, flagged, rating and owner-blocked for every post and writes them back.
    ///
    /// Individual read failures are logged and counted. A task that dies is reported as the
    /// returned error, after the facts of every other post have been committed.
    pub async fn annotate(&self, posts: &mut [Post]) -> crate::Result<AnnotationReport> {
        let viewer = match self.session.viewer() {
            Ok(viewer) => viewer,
            Err(err) => {
                posts.iter_mut().for_each(Post::clear_viewer_state);
                return Err(err.into());
            }
        };

        let mut tasks = JoinSet::new();
        for (slot, post) in posts.iter().enumerate() {
            let post_service = Arc::clone(&self.posts);
            let user_service = Arc::clone(&self.users);
            let viewer_id = viewer.id.clone();
            let post_id = post.id.clone();
            let owner_uid = post.owner_uid.clone();
            let policy = self.policy;
            tasks.spawn(async move {
                let facts = resolve(&post_service, &user_service, &viewer_id, &post_id, &owner_uid, policy).await;
                (slot, facts)
            });
        }
        debug!("annotating {} posts for {}", posts.len(), viewer.id);

        let mut resolved: Vec<Option<ViewerFacts>> = posts.iter().map(|_| None).collect();
        let mut first_failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, facts)) => resolved[slot] = Some(facts),
                Err(err) => {
                    warn!("annotation task failed: {err}");
                    first_failure.get_or_insert(ImmerseError::Task {
                        message: err.to_string().into(),
                    });
                }
            }
        }

        let mut report = AnnotationReport::default();
        for (post, facts) in posts.iter_mut().zip(resolved) {
            post.clear_viewer_state();
            let Some(facts) = facts else {
                if self.policy == BlockCheckPolicy::FailClosed {
                    post.owner_blocked_by_viewer = true;
                    post.withhold_media();
                    report.withheld += 1;
                }
                continue;
            };
            post.liked_by_viewer = facts.liked;
            post.flagged_by_viewer = facts.flagged;
            post.viewer_rating = facts.rating;
            post.owner_blocked_by_viewer = facts.owner_blocked;
            if facts.owner_blocked {
                post.withhold_media();
                report.withheld += 1;
            }
            report.failed_reads += facts.failed_reads;
            report.annotated += 1;
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

async fn resolve(
    posts: &PostService,
    users: &UserService,
    viewer_id: &str,
    post_id: &str,
    owner_uid: &str,
    policy: BlockCheckPolicy,
) -> ViewerFacts {
    let (liked, flagged, rating, blocked) = tokio::join!(
        posts.liked_by(viewer_id, post_id),
        posts.flagged_by(viewer_id, post_id),
        posts.rating_by(viewer_id, post_id),
        users.has_blocked(viewer_id, owner_uid),
    );

    let mut failed_reads = 0;
    let liked = or_absent(liked, "like", post_id, &mut failed_reads);
    let flagged = or_absent(flagged, "flag", post_id, &mut failed_reads);
    let rating = or_absent(rating, "rating", post_id, &mut failed_reads);
    let owner_blocked = match blocked {
        Ok(blocked) => blocked,
        Err(err) => {
            warn!("block check for post {post_id} failed ({policy:?}): {err}");
            failed_reads += 1;
            policy == BlockCheckPolicy::FailClosed
        }
    };
    ViewerFacts {
        liked,
        flagged,
        rating,
        owner_blocked,
        failed_reads,
    }
}

fn or_absent<T: Default>(result: crate::Result<T>, fact: &str, post_id: &str, failures: &mut usize) -> T {
    result.unwrap_or_else(|err| {
        warn!("{fact} lookup for post {post_id} failed: {err}");
        *failures += 1;
        T::default()
    })
}
