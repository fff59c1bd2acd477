use super::support::*;

async fn seeded_feed(harness: &Harness, posts: usize) {
    harness.seed_user("alice", "alice").await;
    harness.seed_user("bob", "bob").await;
    for i in 0..posts {
        let owner = if i % 2 == 0 { "alice" } else { "bob" };
        harness.seed_post(&format!("p{i}"), owner, i as u64).await;
    }
}

fn sorted_ids(posts: &[Post]) -> Vec<String> {
    let mut ids: Vec<String> = posts.iter().map(|post| post.id.clone()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn refresh_publishes_every_remote_post() {
    let harness = Harness::signed_in(VIEWER);
    seeded_feed(&harness, 6).await;
    let mut feed = harness.immerse.feed();

    let posts = feed.refresh().await.expect("refresh");
    assert_eq!(posts.len(), 6);
    assert_eq!(sorted_ids(posts), vec!["p0", "p1", "p2", "p3", "p4", "p5"]);
    assert!(posts.iter().all(|post| post.owner.is_some()));

    let state = feed.state();
    assert!(!state.loading);
    assert!(!state.empty);
    assert_eq!(state.len, 6);
    assert_eq!(state.generation, 1);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn empty_backend_signals_empty() {
    let harness = Harness::signed_in(VIEWER);
    let mut feed = harness.immerse.feed();
    let receiver = feed.subscribe();

    assert!(feed.refresh().await.expect("refresh").is_empty());
    let state = receiver.borrow().clone();
    assert!(state.empty);
    assert!(!state.loading);
}

#[tokio::test]
async fn annotation_reflects_viewer_relationships() {
    let harness = Harness::signed_in(VIEWER);
    seeded_feed(&harness, 4).await;
    let posts = harness.immerse.posts();
    posts.like_post("p0").await.expect("like");
    posts.flag_post("p1", "bob").await.expect("flag");
    posts.rate_post("p2", stars(4)).await.expect("rate");

    let mut feed = harness.immerse.feed();
    feed.refresh().await.expect("refresh");
    let store = feed.store();

    let p0 = store.get("p0").expect("p0");
    assert!(p0.liked_by_viewer);
    assert!(!p0.flagged_by_viewer);
    assert_eq!(p0.likes, 1);
    assert!(store.get("p1").expect("p1").flagged_by_viewer);
    let p2 = store.get("p2").expect("p2");
    assert_eq!(p2.viewer_rating, 4);
    assert_eq!(p2.average_rating, fraction("4/1"));
    let p3 = store.get("p3").expect("p3");
    assert!(!p3.liked_by_viewer && !p3.flagged_by_viewer && p3.viewer_rating == 0);
}

#[tokio::test]
async fn blocked_owner_posts_expose_no_media() {
    let harness = Harness::signed_in(VIEWER);
    seeded_feed(&harness, 4).await;
    harness.seed_block(VIEWER, "bob").await;

    let mut feed = harness.immerse.feed();
    feed.refresh().await.expect("refresh");

    for post in feed.posts() {
        if post.owner_uid == "bob" {
            assert!(post.owner_blocked_by_viewer);
            assert!(post.playable_url().is_none());
            assert!(post.visible_thumbnail().is_none());
            assert!(!post.video_url.is_empty(), "stored URL is masked, not erased");
        } else {
            assert!(post.playable_url().is_some());
        }
    }
    let bob_post = feed.posts().iter().find(|post| post.owner_uid == "bob").expect("bob post").id.clone();
    assert!(matches!(feed.playback_for(&bob_post), Err(ImmerseError::Resource { .. })));
}

#[tokio::test]
async fn failed_block_check_withholds_when_fail_closed() {
    let harness = Harness::with_config(Some(VIEWER), fail_closed());
    seeded_feed(&harness, 3).await;
    harness.store.fail_reads(keys::BLOCKED_USERS);

    let mut feed = harness.immerse.feed();
    let posts = feed.refresh().await.expect("refresh survives failed block reads");
    assert_eq!(posts.len(), 3);
    assert!(posts.iter().all(|post| post.playable_url().is_none()));
}

#[tokio::test]
async fn failed_block_check_plays_when_fail_open() {
    let harness = Harness::with_config(Some(VIEWER), fail_open());
    seeded_feed(&harness, 3).await;
    harness.store.fail_reads(keys::BLOCKED_USERS);

    let mut feed = harness.immerse.feed();
    let posts = feed.refresh().await.expect("refresh");
    assert!(posts.iter().all(|post| post.playable_url().is_some()));
}

#[tokio::test]
async fn failed_fact_reads_are_treated_as_absent() {
    let harness = Harness::signed_in(VIEWER);
    seeded_feed(&harness, 2).await;
    harness.immerse.posts().like_post("p0").await.expect("like");
    harness.store.fail_reads(keys::USER_LIKES);

    let mut feed = harness.immerse.feed();
    feed.refresh().await.expect("refresh");
    assert!(!feed.store().get("p0").expect("p0").liked_by_viewer);
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_list() {
    let harness = Harness::signed_in(VIEWER);
    seeded_feed(&harness, 3).await;
    let mut feed = harness.immerse.feed();
    let before = sorted_ids(feed.refresh().await.expect("first refresh"));

    harness.seed_post("late", "alice", 0).await;
    harness.store.fail_reads(keys::POSTS);
    let err = feed.refresh().await.expect_err("refresh should fail");
    assert!(matches!(err, ImmerseError::RemoteFetch { .. }));

    assert_eq!(sorted_ids(feed.posts()), before);
    let state = feed.state();
    assert!(!state.loading);
    assert!(state.error.is_some());
    assert_eq!(state.generation, 1);

    harness.store.clear_faults();
    assert_eq!(feed.refresh().await.expect("recovered").len(), 4);
    assert_eq!(feed.state().generation, 2);
    assert!(feed.state().error.is_none());
}

#[tokio::test]
async fn fetch_feed_reannotates_an_existing_list() {
    let harness = Harness::signed_in(VIEWER);
    seeded_feed(&harness, 2).await;
    let mut feed = harness.immerse.feed();
    assert_eq!(feed.fetch_feed().await.expect("initial load").len(), 2);

    harness.seed_post("late", "bob", 0).await;
    harness.immerse.posts().like_post("p1").await.expect("like elsewhere");

    let posts = feed.fetch_feed().await.expect("reload");
    assert_eq!(posts.len(), 2, "existing list is re-annotated, not refetched");
    assert!(feed.store().get("p1").expect("p1").liked_by_viewer);
}

#[tokio::test]
async fn unblocking_restores_media_on_reannotation() {
    let harness = Harness::signed_in(VIEWER);
    seeded_feed(&harness, 4).await;
    harness.seed_block(VIEWER, "bob").await;
    let mut feed = harness.immerse.feed();
    feed.refresh().await.expect("refresh");
    assert!(feed.store().get("p1").expect("p1").playable_url().is_none());

    harness.immerse.users().unblock_user("bob").await.expect("unblock");
    let posts = feed.fetch_feed().await.expect("reload");
    for post in posts {
        assert!(!post.owner_blocked_by_viewer);
        assert_eq!(post.playable_url(), Some(format!("https://cdn.example/{}.mov", post.id).as_str()));
        assert!(post.visible_thumbnail().is_some());
    }
    assert!(feed.playback_for("p1").is_ok());
}

#[tokio::test]
async fn media_comes_back_after_a_transient_block_check_failure() {
    let harness = Harness::with_config(Some(VIEWER), fail_closed());
    seeded_feed(&harness, 3).await;
    harness.store.fail_reads(keys::BLOCKED_USERS);
    let mut feed = harness.immerse.feed();
    let posts = feed.refresh().await.expect("refresh");
    assert!(posts.iter().all(|post| post.playable_url().is_none()));

    harness.store.clear_faults();
    let posts = feed.fetch_feed().await.expect("reload");
    assert_eq!(posts.len(), 3);
    assert!(posts.iter().all(|post| !post.owner_blocked_by_viewer && post.playable_url().is_some()));
}

#[tokio::test]
async fn refresh_without_viewer_is_refused() {
    let harness = Harness::signed_out();
    seeded_feed(&harness, 2).await;
    let mut feed = harness.immerse.feed();

    let err = feed.refresh().await.expect_err("no viewer");
    assert!(matches!(err, ImmerseError::NotAuthenticated(_)));
    assert!(feed.posts().is_empty());
}

#[tokio::test]
async fn preload_window_follows_the_visible_post() {
    let harness = Harness::signed_in(VIEWER);
    seeded_feed(&harness, 5).await;
    let mut feed = harness.immerse.feed();
    feed.refresh().await.expect("refresh");
    let order: Vec<String> = feed.posts().iter().map(|post| post.id.clone()).collect();

    let report = feed.preload_from(3);
    assert_eq!(report.prepared, vec![order[4].clone()]);

    let report = feed.preload_from(0);
    assert_eq!(report.prepared, vec![order[1].clone(), order[2].clone()]);
    assert!(!feed.preloader().is_cached(&order[0]));

    let resource = feed.playback_for(&order[1]).expect("cached resource");
    assert_eq!(resource.post_id, order[1]);
    assert_eq!(feed.preload_from(4).prepared.len(), 0);
}

#[tokio::test]
async fn removing_a_post_updates_the_state() {
    let harness = Harness::signed_in("alice");
    seeded_feed(&harness, 3).await;
    let mut feed = harness.immerse.feed();
    feed.refresh().await.expect("refresh");

    feed.remove("p0").await.expect("owner removes own post");
    assert_eq!(feed.state().len, 2);
    assert!(feed.store().get("p0").is_none());
    assert!(!harness.has_path(&keys::post("p0")).await);
}
