use super::support::*;

async fn loaded_feed(harness: &Harness) -> immerse::FeedController {
    harness.seed_user("alice", "alice").await;
    harness.seed_post("p1", "alice", 5).await;
    harness.seed_post("p2", "alice", 0).await;
    let mut feed = harness.immerse.feed();
    feed.refresh().await.expect("refresh");
    feed
}

#[tokio::test]
async fn like_then_unlike_round_trips_counts_and_mirrors() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;

    feed.store_mut().apply_like("p1").await.expect("like");
    let post = feed.store().get("p1").expect("p1");
    assert!(post.liked_by_viewer);
    assert_eq!(post.likes, 6);
    assert_eq!(harness.stored_post("p1").await.likes, 6);
    assert!(harness.has_path(&keys::post_like("p1", VIEWER)).await);
    assert!(harness.has_path(&keys::user_like(VIEWER, "p1")).await);

    feed.store_mut().apply_like("p1").await.expect("second like is a no-op");
    assert_eq!(harness.stored_post("p1").await.likes, 6);

    feed.store_mut().apply_unlike("p1").await.expect("unlike");
    let post = feed.store().get("p1").expect("p1");
    assert!(!post.liked_by_viewer);
    assert_eq!(post.likes, 5);
    assert!(!harness.has_path(&keys::post_like("p1", VIEWER)).await);
    assert!(!harness.has_path(&keys::user_like(VIEWER, "p1")).await);
}

#[tokio::test]
async fn failed_like_write_restores_local_state() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;
    let before = feed.store().get("p1").expect("p1").clone();

    harness.store.fail_writes(keys::USER_LIKES);
    let err = feed.store_mut().apply_like("p1").await.expect_err("mirror write fails");
    assert!(err.is_remote_write());

    let after = feed.store().get("p1").expect("p1");
    assert_eq!(after, &before);
    assert!(!harness.has_path(&keys::post_like("p1", VIEWER)).await, "partial write undone");
    assert_eq!(harness.stored_post("p1").await.likes, 5);
}

#[tokio::test]
async fn failed_unlike_write_restores_local_state() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;
    feed.store_mut().apply_like("p1").await.expect("like");
    let before = feed.store().get("p1").expect("p1").clone();

    harness.store.fail_writes(keys::POST_LIKES);
    feed.store_mut().apply_unlike("p1").await.expect_err("unlike fails");
    let after = feed.store().get("p1").expect("p1");
    assert_eq!(after.likes, before.likes);
    assert!(after.liked_by_viewer);
}

#[tokio::test]
async fn unlike_with_zero_likes_is_a_no_op() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;
    let writes = harness.store.write_count();

    feed.store_mut().apply_unlike("p2").await.expect("no-op");
    assert_eq!(feed.store().get("p2").expect("p2").likes, 0);
    assert_eq!(harness.store.write_count(), writes);
}

#[tokio::test]
async fn toggle_like_flips_between_states() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;

    feed.store_mut().toggle_like("p2").await.expect("toggle on");
    assert!(feed.store().get("p2").expect("p2").liked_by_viewer);
    feed.store_mut().toggle_like("p2").await.expect("toggle off");
    assert!(!feed.store().get("p2").expect("p2").liked_by_viewer);
}

#[tokio::test]
async fn flag_and_unflag_write_flag_records() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;

    feed.store_mut().apply_flag("p1").await.expect("flag");
    assert!(feed.store().get("p1").expect("p1").flagged_by_viewer);
    assert!(harness.has_path(&keys::flagger("p1", VIEWER)).await);
    let flag = harness.store.get(&keys::flag("p1")).await.expect("read").expect("flag doc");
    assert_eq!(flag["flaggedUid"], "alice");

    harness.store.fail_writes(keys::FLAGGERS);
    feed.store_mut().apply_unflag("p1").await.expect_err("unflag fails");
    assert!(feed.store().get("p1").expect("p1").flagged_by_viewer, "rolled back");

    harness.store.clear_faults();
    feed.store_mut().apply_unflag("p1").await.expect("unflag");
    assert!(!harness.has_path(&keys::flagger("p1", VIEWER)).await);
}

#[tokio::test]
async fn rerating_counts_the_viewer_once() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;

    let first = feed.store_mut().apply_rating("p1", stars(4)).await.expect("rate 4");
    assert_eq!(first, fraction("4/1"));
    let second = feed.store_mut().apply_rating("p1", stars(2)).await.expect("rate 2");
    assert_eq!(second.count(), 1);
    assert_eq!(i64::from(second.sum()) - i64::from(first.sum()), -2);

    let post = feed.store().get("p1").expect("p1");
    assert_eq!(post.viewer_rating, 2);
    assert_eq!(post.ratings, 1);
    assert_eq!(harness.stored_post("p1").await.average_rating, fraction("2/1"));
}

#[tokio::test]
async fn backend_aggregate_overrides_the_local_guess() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;

    harness.sign_in_as("carol");
    harness.immerse.posts().rate_post("p1", stars(5)).await.expect("carol rates");
    harness.sign_in_as(VIEWER);

    let aggregate = feed.store_mut().apply_rating("p1", stars(3)).await.expect("rate");
    assert_eq!(aggregate, fraction("8/2"));
    assert_eq!(feed.store().get("p1").expect("p1").average_rating, fraction("8/2"));
    assert_eq!(aggregate.formatted(), "4.00");
}

#[tokio::test]
async fn failed_rating_write_restores_aggregate_and_viewer_rating() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;
    feed.store_mut().apply_rating("p1", stars(4)).await.expect("rate");
    let before = feed.store().get("p1").expect("p1").clone();

    harness.store.fail_writes(keys::STAR_RATINGS);
    feed.store_mut().apply_rating("p1", stars(1)).await.expect_err("write fails");
    assert_eq!(feed.store().get("p1").expect("p1"), &before);

    feed.store_mut().apply_unrating("p1").await.expect_err("delete fails");
    assert_eq!(feed.store().get("p1").expect("p1"), &before);
}

#[tokio::test]
async fn unreadable_ratings_leave_no_record_behind() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;
    let before = feed.store().get("p1").expect("p1").clone();

    harness.store.fail_reads(keys::STAR_RATINGS);
    let err = feed.store_mut().apply_rating("p1", stars(4)).await.expect_err("ratings unreadable");
    assert!(matches!(err, ImmerseError::RemoteFetch { .. }));
    assert_eq!(feed.store().get("p1").expect("p1"), &before);

    harness.store.clear_faults();
    assert!(!harness.has_path(&keys::star_rating("p1", VIEWER)).await);
    assert_eq!(harness.stored_post("p1").await.average_rating, before.average_rating);
}

#[tokio::test]
async fn failed_aggregate_rebuild_puts_the_previous_rating_back() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;
    feed.store_mut().apply_rating("p1", stars(4)).await.expect("rate");
    let before = feed.store().get("p1").expect("p1").clone();
    let posts = harness.immerse.posts();

    harness.store.fail_lists(keys::STAR_RATINGS);
    feed.store_mut().apply_rating("p1", stars(1)).await.expect_err("rebuild fails");
    assert_eq!(feed.store().get("p1").expect("p1"), &before);
    assert_eq!(posts.rating_by(VIEWER, "p1").await.expect("rating"), 4);

    feed.store_mut().apply_unrating("p1").await.expect_err("rebuild fails");
    assert_eq!(feed.store().get("p1").expect("p1"), &before);
    assert_eq!(posts.rating_by(VIEWER, "p1").await.expect("rating"), 4);

    feed.store_mut().apply_rating("p2", stars(5)).await.expect_err("rebuild fails");
    assert!(!harness.has_path(&keys::star_rating("p2", VIEWER)).await, "new record removed");

    harness.store.clear_faults();
    assert_eq!(harness.stored_post("p1").await.average_rating, fraction("4/1"));
    assert_eq!(harness.stored_post("p2").await.average_rating, RatingFraction::EMPTY);
}

#[tokio::test]
async fn toggling_the_same_star_removes_the_rating() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;

    feed.store_mut().toggle_rating("p2", stars(3)).await.expect("rate");
    assert_eq!(feed.store().get("p2").expect("p2").viewer_rating, 3);

    let aggregate = feed.store_mut().toggle_rating("p2", stars(3)).await.expect("unrate");
    assert!(aggregate.is_empty());
    assert_eq!(aggregate.to_string(), "0/1");
    let post = feed.store().get("p2").expect("p2");
    assert_eq!(post.viewer_rating, 0);
    assert_eq!(post.ratings, 0);
    assert!(!harness.has_path(&keys::star_rating("p2", VIEWER)).await);
}

#[tokio::test]
async fn failed_remove_reinserts_at_the_same_index() {
    let harness = Harness::signed_in("alice");
    let mut feed = loaded_feed(&harness).await;
    let index = feed.store().index_of("p2").expect("p2 index");

    harness.store.fail_writes("posts/p2");
    feed.remove("p2").await.expect_err("delete fails");
    assert_eq!(feed.store().index_of("p2"), Some(index));
    assert_eq!(feed.posts().len(), 2);
}

#[tokio::test]
async fn removing_someone_elses_post_is_refused() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;

    let err = feed.remove("p1").await.expect_err("not the owner");
    assert!(matches!(err, ImmerseError::NotPermitted { .. }));
    assert!(feed.store().get("p1").is_some());
}

#[tokio::test]
async fn writes_without_a_viewer_touch_nothing() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;
    let before = feed.store().get("p1").expect("p1").clone();
    let writes = harness.store.write_count();
    harness.auth.set_current(None);

    let err = feed.store_mut().apply_like("p1").await.expect_err("signed out");
    assert!(matches!(err, ImmerseError::NotAuthenticated(_)));
    feed.store_mut().apply_rating("p1", stars(5)).await.expect_err("signed out");
    feed.store_mut().apply_flag("p1").await.expect_err("signed out");

    assert_eq!(feed.store().get("p1").expect("p1"), &before);
    assert_eq!(harness.store.write_count(), writes);
}

#[tokio::test]
async fn unknown_posts_are_not_found() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = loaded_feed(&harness).await;
    let err = feed.store_mut().apply_like("missing").await.expect_err("unknown");
    assert!(matches!(err, ImmerseError::NotFound { .. }));
}
