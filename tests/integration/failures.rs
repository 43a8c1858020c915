use crate::support::*;
use share9p::error::{ErrorKind, RemoteOp, Stage};
use share9p::types::NodeKind;
use std::time::Duration;

#[tokio::test]
async fn failed_remote_create_leaves_no_local_entry() {
    let harness = Harness::new();
    let mut session = harness.session();
    harness.store.fail_next(RemoteOp::Upload, None, "quota exceeded");

    let err = create(&mut session, "/", "docs", NodeKind::Directory)
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::RemoteCreate);
    assert_eq!(err.kind(), ErrorKind::RemoteUploadFailed);
    assert!(err.to_string().starts_with("remote create failed → "));

    let err = walk(&mut session, "/docs").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(harness.gateway.namespace().total_count(), 1);

    // The name is free again.
    create(&mut session, "/", "docs", NodeKind::Directory)
        .await
        .unwrap();
    assert!(harness.store.exists("/docs"));
}

#[tokio::test]
async fn failed_upload_keeps_previous_content() {
    let harness = Harness::new();
    harness.store.seed_file("/a.txt", b"abc");
    let mut session = harness.session();
    assert_eq!(read(&mut session, "/a.txt", 0, 10).await.unwrap(), b"abc");

    harness
        .store
        .fail_next(RemoteOp::Upload, Some("/a.txt"), "conflict");
    let err = write(&mut session, "/a.txt", 3, b"def").await.unwrap_err();
    assert_eq!(err.stage, Stage::Write);
    assert_eq!(err.kind(), ErrorKind::RemoteUploadFailed);

    assert_eq!(stat(&mut session, "/a.txt").await.unwrap().size, 3);
    assert_eq!(read(&mut session, "/a.txt", 0, 10).await.unwrap(), b"abc");
    assert_eq!(harness.store.content("/a.txt").unwrap(), b"abc");
}

#[tokio::test]
async fn failed_remote_delete_still_drops_the_local_entry() {
    let harness = Harness::new();
    harness.store.seed_file("/a.txt", b"abc");
    let mut session = harness.session();
    walk(&mut session, "/a.txt").await.unwrap();

    harness
        .store
        .fail_next(RemoteOp::Delete, Some("/a.txt"), "locked");
    let err = remove(&mut session, "/a.txt").await.unwrap_err();
    assert_eq!(err.stage, Stage::RemoteDelete);
    assert_eq!(err.kind(), ErrorKind::RemoteDeleteFailed);
    assert!(harness.gateway.namespace().resolve("/a.txt").is_err());

    // Still on the share, so the next request lists it again.
    assert!(harness.store.exists("/a.txt"));
    assert_eq!(walk(&mut session, "/a.txt").await.unwrap().kind, NodeKind::File);
}

#[tokio::test]
async fn removing_a_missing_path_reports_the_tree_stage() {
    let harness = Harness::new();
    let mut session = harness.session();

    let err = remove(&mut session, "/missing").await.unwrap_err();
    assert_eq!(err.stage, Stage::TreeRemove);
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().starts_with("tree remove failed → "));
}

#[tokio::test]
async fn listing_failure_fails_the_request_and_recovers() {
    let harness = Harness::new();
    harness.store.seed_file("/a.txt", b"abc");
    let mut session = harness.session();
    harness.store.fail_next(RemoteOp::List, None, "unavailable");

    let err = walk(&mut session, "/a.txt").await.unwrap_err();
    assert_eq!(err.stage, Stage::Walk);
    assert_eq!(err.kind(), ErrorKind::RemoteListFailed);
    assert!(!err.is_retryable());

    assert_eq!(stat(&mut session, "/a.txt").await.unwrap().size, 3);
}

#[tokio::test(start_paused = true)]
async fn slow_remote_times_out_as_retryable() {
    let harness = Harness::with_timeout(Duration::from_millis(200));
    harness.store.seed_file("/a.txt", b"abc");
    let mut session = harness.session();
    walk(&mut session, "/a.txt").await.unwrap();

    harness.store.set_latency(Some(Duration::from_secs(2)));
    let err = read(&mut session, "/a.txt", 0, 3).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_retryable());
    assert_eq!(err.io_kind(), std::io::ErrorKind::TimedOut);

    harness.store.set_latency(None);
    assert_eq!(read(&mut session, "/a.txt", 0, 3).await.unwrap(), b"abc");
}

#[tokio::test]
async fn removing_the_root_leaves_the_share_usable() {
    let harness = Harness::new();
    let mut session = harness.session();
    let mut other = harness.session();

    let err = remove(&mut session, "/").await.unwrap_err();
    assert_eq!(err.stage, Stage::TreeRemove);
    assert_eq!(err.kind(), ErrorKind::InvalidName);
    assert_eq!(harness.store.calls(RemoteOp::Delete), 0);
    assert!(harness.store.exists("/"));

    create(&mut session, "/", "still.txt", NodeKind::File)
        .await
        .unwrap();
    assert!(stat(&mut other, "/").await.unwrap().is_dir());
    assert_eq!(read_dir(&mut other, "/", 10).await.unwrap().unwrap(), vec!["still.txt"]);
}
