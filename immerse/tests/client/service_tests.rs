use super::support::*;
use immerse::NotificationKind;
use immerse::services::UserList;

fn validation_code(err: &ImmerseError, code: &str) -> bool {
    matches!(err, ImmerseError::Validation(validation) if validation.has_code(code))
}

#[tokio::test]
async fn liking_twice_counts_once_and_writes_both_records() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_user("alice", "alice").await;
    harness.seed_post("p1", "alice", 2).await;
    let posts = harness.immerse.posts();

    assert_eq!(posts.like_post("p1").await.expect("like"), 3);
    assert_eq!(posts.like_post("p1").await.expect("again"), 3);
    assert!(posts.has_liked("p1").await.expect("has liked"));
    assert!(harness.has_path(&keys::post_like("p1", VIEWER)).await);
    assert!(harness.has_path(&keys::user_like(VIEWER, "p1")).await);

    let notifications = harness.store.list(&keys::notifications("alice")).await.expect("list");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].data["type"], "like");
    assert_eq!(notifications[0].data["postId"], "p1");
}

#[tokio::test]
async fn liking_your_own_post_creates_no_notification() {
    let harness = Harness::signed_in("alice");
    harness.seed_post("p1", "alice", 0).await;

    harness.immerse.posts().like_post("p1").await.expect("like");
    assert!(harness.store.list(&keys::notifications("alice")).await.expect("list").is_empty());
}

#[tokio::test]
async fn unliking_retracts_the_like_notification() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_post("p1", "alice", 0).await;
    let posts = harness.immerse.posts();

    posts.like_post("p1").await.expect("like");
    assert_eq!(posts.unlike_post("p1").await.expect("unlike"), 0);
    assert!(!posts.has_liked("p1").await.expect("has liked"));
    assert!(harness.store.list(&keys::notifications("alice")).await.expect("list").is_empty());
    assert_eq!(posts.unlike_post("p1").await.expect("unlike at zero"), 0);
}

#[tokio::test]
async fn liked_posts_come_from_the_mirror_records() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_user("alice", "alice").await;
    harness.seed_post("p1", "alice", 0).await;
    harness.seed_post("p2", "alice", 0).await;
    let posts = harness.immerse.posts();
    posts.like_post("p2").await.expect("like");

    let liked = posts.fetch_liked_posts(VIEWER).await.expect("liked posts");
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].id, "p2");
    assert_eq!(liked[0].owner.as_ref().map(|owner| owner.username.as_str()), Some("alice"));
}

#[tokio::test]
async fn user_posts_are_newest_first() {
    let harness = Harness::signed_in(VIEWER);
    let alice = harness.seed_user("alice", "alice").await;
    harness.seed_post("old", "alice", 0).await;
    harness.seed_post("other", "bob", 0).await;
    harness.seed_post("new", "alice", 0).await;

    let posts = harness.immerse.posts().fetch_user_posts(&alice).await.expect("user posts");
    let ids: Vec<&str> = posts.iter().map(|post| post.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[tokio::test]
async fn missing_posts_are_reported() {
    let harness = Harness::signed_in(VIEWER);
    let err = harness.immerse.posts().like_post("ghost").await.expect_err("missing");
    assert!(matches!(err, ImmerseError::NotFound { kind: "post", .. }));
}

#[tokio::test]
async fn flags_record_the_owner_and_the_flagger() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_post("p1", "alice", 0).await;
    let posts = harness.immerse.posts();

    posts.flag_post("p1", "alice").await.expect("flag");
    assert!(posts.is_flagged("p1").await.expect("is flagged"));
    posts.unflag_post("p1").await.expect("unflag");
    assert!(!posts.is_flagged("p1").await.expect("is flagged"));
    assert!(harness.has_path(&keys::flag("p1")).await, "the flag document stays");
}

#[tokio::test]
async fn ratings_aggregate_across_viewers() {
    let harness = Harness::signed_in("carol");
    harness.seed_post("p1", "alice", 0).await;
    let posts = harness.immerse.posts();

    posts.rate_post("p1", stars(5)).await.expect("carol");
    harness.sign_in_as(VIEWER);
    assert_eq!(posts.rate_post("p1", stars(2)).await.expect("viewer"), fraction("7/2"));
    assert_eq!(posts.rate_post("p1", stars(4)).await.expect("re-rate"), fraction("9/2"));
    assert_eq!(posts.viewer_rating("p1").await.expect("rating"), 4);

    let stored = harness.stored_post("p1").await;
    assert_eq!(stored.average_rating, fraction("9/2"));
    assert_eq!(stored.ratings, 2);

    assert_eq!(posts.remove_rating("p1").await.expect("remove"), fraction("5/1"));
    assert_eq!(posts.viewer_rating("p1").await.expect("rating"), 0);

    let mut local = harness.seed_post("p2", "alice", 0).await;
    posts.refresh_rating(&mut local).await.expect("refresh");
    assert!(local.average_rating.is_empty());
}

#[tokio::test]
async fn following_updates_both_sides_and_stats() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_user(VIEWER, "viewer").await;
    harness.seed_user("alice", "alice").await;
    harness.seed_post("p1", "alice", 0).await;
    let users = harness.immerse.users();

    users.follow("alice").await.expect("follow");
    assert!(users.is_followed("alice").await.expect("is followed"));
    assert!(harness.has_path(&keys::followed(VIEWER, "alice")).await);
    assert!(harness.has_path(&keys::follower("alice", VIEWER)).await);

    let alice = users.fetch_user_stats("alice").await.expect("alice stats");
    assert_eq!((alice.followers, alice.following, alice.posts), (1, 0, 1));
    let viewer = users.fetch_user_stats(VIEWER).await.expect("viewer stats");
    assert_eq!((viewer.followers, viewer.following), (0, 1));

    let followers = users.fetch_user_list(&UserList::Followers("alice".into())).await.expect("followers");
    assert_eq!(followers.iter().map(|user| user.id.as_str()).collect::<Vec<_>>(), vec![VIEWER]);

    let notifications = harness.store.list(&keys::notifications("alice")).await.expect("list");
    assert_eq!(notifications.len(), 1);

    users.unfollow("alice").await.expect("unfollow");
    assert!(!users.is_followed("alice").await.expect("is followed"));
    assert_eq!(users.fetch_user_stats("alice").await.expect("stats").followers, 0);
    assert!(harness.store.list(&keys::notifications("alice")).await.expect("list").is_empty());
}

#[tokio::test]
async fn failed_follower_write_undoes_the_following_record() {
    let harness = Harness::signed_in(VIEWER);
    harness.store.fail_writes(keys::USER_FOLLOWERS);

    let err = harness.immerse.users().follow("alice").await.expect_err("follower write fails");
    assert!(err.is_remote_write());
    assert!(!harness.has_path(&keys::followed(VIEWER, "alice")).await);
}

#[tokio::test]
async fn users_cannot_follow_or_block_themselves() {
    let harness = Harness::signed_in(VIEWER);
    let users = harness.immerse.users();

    assert!(matches!(users.follow(VIEWER).await, Err(ImmerseError::NotPermitted { .. })));
    assert!(matches!(users.block_user(VIEWER).await, Err(ImmerseError::NotPermitted { .. })));
    assert_eq!(harness.store.write_count(), 0);
}

#[tokio::test]
async fn blocking_is_listed_and_reversible() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_user("bob", "bob").await;
    let users = harness.immerse.users();

    users.block_user("bob").await.expect("block");
    assert!(users.is_blocked("bob").await.expect("is blocked"));
    let blocked = users.fetch_user_list(&UserList::Blocked).await.expect("blocked");
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].username, "bob");

    users.unblock_user("bob").await.expect("unblock");
    assert!(!users.has_blocked(VIEWER, "bob").await.expect("has blocked"));
    assert!(users.blocked_users().await.expect("blocked").is_empty());
}

#[tokio::test]
async fn explore_list_excludes_the_viewer() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_user(VIEWER, "viewer").await;
    harness.seed_user("alice", "alice").await;
    harness.seed_user("bob", "bob").await;

    let users = harness.immerse.users().fetch_user_list(&UserList::All).await.expect("users");
    let ids: Vec<&str> = users.iter().map(|user| user.id.as_str()).collect();
    assert_eq!(ids, vec!["alice", "bob"]);
}

#[tokio::test]
async fn post_likers_are_listed() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_user(VIEWER, "viewer").await;
    harness.seed_post("p1", "alice", 0).await;
    harness.immerse.posts().like_post("p1").await.expect("like");

    let likers = harness
        .immerse
        .users()
        .fetch_user_list(&UserList::Likes("p1".into()))
        .await
        .expect("likers");
    assert_eq!(likers.len(), 1);
    assert_eq!(likers[0].id, VIEWER);
}

#[tokio::test]
async fn comments_are_added_listed_and_deleted_by_their_author() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_user(VIEWER, "viewer").await;
    harness.seed_post("p1", "alice", 0).await;
    let comments = harness.immerse.comments();

    let first = comments.upload_comment("p1", "  great clip ").await.expect("comment");
    assert_eq!(first.comment_text, "great clip");
    assert_eq!(first.post_owner_uid, "alice");
    comments.upload_comment("p1", "second").await.expect("comment");
    assert_eq!(harness.stored_post("p1").await.comment_count, 2);

    let listed = comments.fetch_comments("p1").await.expect("list");
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|comment| comment.user.is_some()));

    harness.sign_in_as("alice");
    let err = comments.delete_comment("p1", &first.id).await.expect_err("not the author");
    assert!(matches!(err, ImmerseError::NotPermitted { .. }));

    harness.sign_in_as(VIEWER);
    comments.delete_comment("p1", &first.id).await.expect("delete");
    assert_eq!(comments.fetch_comments("p1").await.expect("list").len(), 1);
    assert_eq!(harness.stored_post("p1").await.comment_count, 1);
}

#[tokio::test]
async fn comments_are_validated_before_any_write() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_post("p1", "alice", 0).await;
    let comments = harness.immerse.comments();
    let writes = harness.store.write_count();

    let err = comments.upload_comment("p1", "   ").await.expect_err("empty");
    assert!(validation_code(&err, "validation.required"));
    let err = comments.upload_comment("p1", &"x".repeat(501)).await.expect_err("too long");
    assert!(validation_code(&err, "validation.length"));
    assert_eq!(harness.store.write_count(), writes);
}

#[tokio::test]
async fn notifications_are_newest_first_with_actors() {
    let harness = Harness::signed_in(VIEWER);
    harness.seed_user(VIEWER, "viewer").await;
    harness.seed_post("p1", "alice", 0).await;
    harness.immerse.posts().like_post("p1").await.expect("like");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    harness.immerse.users().follow("alice").await.expect("follow");

    harness.sign_in_as("alice");
    let notifications = harness.immerse.notifications().fetch_notifications().await.expect("notifications");
    let kinds: Vec<NotificationKind> = notifications.iter().map(|notification| notification.kind).collect();
    assert_eq!(kinds, vec![NotificationKind::Follow, NotificationKind::Like]);
    assert!(notifications.iter().all(|notification| notification.actor.is_some()));
    assert_eq!(notifications[1].post_id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn notifications_need_a_viewer() {
    let harness = Harness::signed_out();
    let err = harness.immerse.notifications().fetch_notifications().await.expect_err("signed out");
    assert!(matches!(err, ImmerseError::NotAuthenticated(_)));
}
