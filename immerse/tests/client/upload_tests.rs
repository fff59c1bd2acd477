use super::support::*;
use immerse::services::UploadKind;

fn small_limits() -> Harness {
    let mut config = ImmerseConfig::default();
    config.upload.max_video_bytes = 16;
    config.upload.max_image_bytes = 8;
    Harness::with_config(Some(VIEWER), config)
}

fn has_code(err: &ImmerseError, code: &str) -> bool {
    matches!(err, ImmerseError::Validation(validation) if validation.has_code(code))
}

#[tokio::test]
async fn oversize_and_empty_payloads_never_reach_storage() {
    let harness = small_limits();
    let uploads = harness.immerse.uploads();

    let err = uploads.upload_video(vec![0; 17]).await.expect_err("too large");
    assert!(has_code(&err, "upload.too_large"));
    let err = uploads.upload_video(Vec::new()).await.expect_err("empty");
    assert!(has_code(&err, "upload.empty"));
    let err = uploads
        .upload_image(UploadKind::ProfileImage, vec![0; 9])
        .await
        .expect_err("image too large");
    assert!(has_code(&err, "upload.too_large"));

    assert_eq!(harness.storage.object_count(), 0);
    assert!(uploads.check_size(UploadKind::Video, 16).is_ok());
}

#[tokio::test]
async fn videos_cannot_go_through_the_image_path() {
    let harness = small_limits();
    let err = harness
        .immerse
        .uploads()
        .upload_image(UploadKind::Video, vec![1; 4])
        .await
        .expect_err("wrong kind");
    assert!(has_code(&err, "upload.kind"));
}

#[tokio::test]
async fn uploads_require_a_viewer() {
    let harness = Harness::signed_out();
    let err = harness.immerse.uploads().upload_video(vec![1; 4]).await.expect_err("signed out");
    assert!(matches!(err, ImmerseError::NotAuthenticated(_)));
    assert_eq!(harness.storage.object_count(), 0);
}

#[tokio::test]
async fn publishing_a_video_stores_media_and_the_post() {
    let harness = small_limits();
    let post = harness
        .immerse
        .uploads()
        .publish_video(vec![1; 12], "first clip", Some(vec![2; 4]))
        .await
        .expect("publish");

    assert_eq!(post.owner_uid, VIEWER);
    assert!(post.video_url.starts_with("https://media.example/videos/"));
    assert!(post.video_url.ends_with(".mov"));
    assert!(post.thumbnail_url.starts_with("https://media.example/post_images/"));
    assert_eq!(harness.storage.object_count(), 2);

    let stored = harness.stored_post(&post.id).await;
    assert_eq!(stored.caption, "first clip");
    assert_eq!(stored.thumbnail_url, post.thumbnail_url);
    assert_eq!(stored.likes, 0);

    let video_key = harness
        .storage
        .keys()
        .into_iter()
        .find(|key| key.starts_with("videos/"))
        .expect("video object");
    assert_eq!(harness.storage.content_type(&video_key).as_deref(), Some("video/quicktime"));
}

#[tokio::test]
async fn thumbnail_failure_still_publishes_the_post() {
    let harness = small_limits();
    let uploads = harness.immerse.uploads();
    let video_url = uploads.upload_video(vec![1; 12]).await.expect("video");
    harness.storage.set_failing(true);

    let post = uploads
        .upload_post(immerse::services::NewPost {
            caption: "no thumb".to_string(),
            video_url: video_url.clone(),
            thumbnail: Some(vec![2; 4]),
        })
        .await
        .expect("post survives");
    assert!(post.thumbnail_url.is_empty());
    assert_eq!(harness.stored_post(&post.id).await.video_url, video_url);
}

#[tokio::test]
async fn failed_video_upload_publishes_nothing() {
    let harness = small_limits();
    harness.storage.set_failing(true);

    let err = harness
        .immerse
        .uploads()
        .publish_video(vec![1; 12], "lost", None)
        .await
        .expect_err("storage down");
    assert!(err.is_remote_write());
    assert!(harness.store.list(keys::POSTS).await.expect("posts").is_empty());
}

#[tokio::test]
async fn profile_image_updates_the_profile() {
    let harness = small_limits();
    harness.seed_user(VIEWER, "viewer").await;

    let url = harness
        .immerse
        .uploads()
        .update_profile_image(vec![3; 6])
        .await
        .expect("profile image");
    assert!(url.starts_with("https://media.example/profile_images/"));
    assert!(url.ends_with(".jpg"));

    let profile = harness.immerse.session().current_profile().await.expect("profile");
    assert_eq!(profile.profile_image_url.as_deref(), Some(url.as_str()));
}
