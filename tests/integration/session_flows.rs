use crate::support::*;
use share9p::error::{ErrorKind, Stage};
use share9p::protocol::{Request, Response};
use share9p::types::NodeKind;

#[tokio::test]
async fn create_write_read_roundtrip_reaches_the_share() {
    let harness = Harness::new();
    let mut session = harness.session();

    create(&mut session, "/", "docs", NodeKind::Directory)
        .await
        .unwrap();
    create(&mut session, "/docs", "note.txt", NodeKind::File)
        .await
        .unwrap();
    assert_eq!(write(&mut session, "/docs/note.txt", 0, b"hello").await.unwrap(), 5);
    assert_eq!(read(&mut session, "/docs/note.txt", 0, 5).await.unwrap(), b"hello");

    write(&mut session, "/docs/note.txt", 2, b"XY").await.unwrap();
    assert_eq!(read(&mut session, "/docs/note.txt", 0, 5).await.unwrap(), b"heXY");
    assert_eq!(harness.store.content("/docs/note.txt").unwrap(), b"heXY");
}

#[tokio::test]
async fn write_past_end_leaves_content_unchanged() {
    let harness = Harness::new();
    harness.store.seed_file("/a.txt", b"hello");
    let mut session = harness.session();

    let err = write(&mut session, "/a.txt", 10, b"z").await.unwrap_err();
    assert_eq!(err.stage, Stage::Write);
    assert_eq!(err.kind(), ErrorKind::Boundary);
    assert_eq!(read(&mut session, "/a.txt", 0, 10).await.unwrap(), b"hello");
    assert_eq!(harness.store.content("/a.txt").unwrap(), b"hello");
}

#[tokio::test]
async fn reading_at_the_end_is_end_of_stream() {
    let harness = Harness::new();
    harness.store.seed_file("/a.txt", b"abc");
    let mut session = harness.session();

    assert_eq!(read(&mut session, "/a.txt", 1, 100).await.unwrap(), b"bc");
    let err = read(&mut session, "/a.txt", 3, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Boundary);
}

#[tokio::test]
async fn reads_observe_remote_changes() {
    let harness = Harness::new();
    harness.store.seed_file("/a.txt", b"v1");
    let mut session = harness.session();
    assert_eq!(read(&mut session, "/a.txt", 0, 10).await.unwrap(), b"v1");

    harness.store.seed_file("/a.txt", b"version2");
    assert_eq!(read(&mut session, "/a.txt", 0, 10).await.unwrap(), b"version2");
}

#[tokio::test]
async fn walk_loads_nested_directories() {
    let harness = Harness::new();
    harness.store.seed_file("/a/b/deep.txt", b"deep");
    let mut session = harness.session();

    walk(&mut session, "/a").await.unwrap();
    walk(&mut session, "/a/b").await.unwrap();
    let info = walk(&mut session, "/a/b/deep.txt").await.unwrap();
    assert_eq!(info.kind, NodeKind::File);
    assert_eq!(info.size, 4);
}

#[tokio::test]
async fn stat_reports_metadata() {
    let harness = Harness::new();
    harness.store.seed_file("/d/one", b"1");
    harness.store.seed_file("/d/two", b"22");
    let mut session = harness.session();
    walk(&mut session, "/d").await.unwrap();

    let dir = stat(&mut session, "/d").await.unwrap();
    assert!(dir.is_dir());
    assert_eq!(dir.size, 2);
    assert_eq!(dir.mode & 0o777, 0o777);
    assert_eq!(dir.uid, "none");

    let file = stat(&mut session, "/d/two").await.unwrap();
    assert_eq!(file.size, 2);
    assert_eq!(file.mode, 0o777);
}

#[tokio::test]
async fn insert_then_remove_then_resolve_fails() {
    let harness = Harness::new();
    let mut session = harness.session();

    create(&mut session, "/", "a", NodeKind::File).await.unwrap();
    assert_eq!(walk(&mut session, "/a").await.unwrap().kind, NodeKind::File);
    remove(&mut session, "/a").await.unwrap();

    let err = walk(&mut session, "/a").await.unwrap_err();
    assert_eq!(err.stage, Stage::Walk);
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn duplicate_create_fails_and_keeps_the_tree() {
    let harness = Harness::new();
    let mut session = harness.session();

    create(&mut session, "/", "a", NodeKind::File).await.unwrap();
    let err = create(&mut session, "/", "a", NodeKind::Directory)
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::Insert);
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(walk(&mut session, "/a").await.unwrap().kind, NodeKind::File);
    assert_eq!(harness.gateway.namespace().total_count(), 2);
}

#[tokio::test]
async fn create_under_a_file_is_rejected() {
    let harness = Harness::new();
    harness.store.seed_file("/f", b"x");
    let mut session = harness.session();

    let err = create(&mut session, "/f", "child", NodeKind::File)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotADirectory);
}

#[tokio::test]
async fn truncate_is_unsupported_and_settimes_succeeds() {
    let harness = Harness::new();
    harness.store.seed_file("/f", b"x");
    let mut session = harness.session();

    let err = session
        .dispatch(Request::Truncate {
            path: "/f".to_string(),
            size: 0,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "truncate failed → truncate is not supported");

    let done = session
        .dispatch(Request::SetTimes {
            path: "/f".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(done, Response::Done);
}

#[tokio::test]
async fn empty_files_stay_local_until_written() {
    let harness = Harness::new();
    let mut session = harness.session();

    create(&mut session, "/", "empty", NodeKind::File).await.unwrap();
    assert!(!harness.store.exists("/empty"));
    assert_eq!(stat(&mut session, "/empty").await.unwrap().size, 0);

    remove(&mut session, "/empty").await.unwrap();
    assert!(walk(&mut session, "/empty").await.is_err());
}

#[tokio::test]
async fn create_names_cannot_leave_the_target_directory() {
    let harness = Harness::new();
    let mut session = harness.session();
    create(&mut session, "/", "d", NodeKind::Directory)
        .await
        .unwrap();
    create(&mut session, "/d", "a", NodeKind::Directory)
        .await
        .unwrap();

    for name in ["../escaped", "a/b"] {
        let err = create(&mut session, "/d", name, NodeKind::File)
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Insert);
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }
    assert_eq!(read_dir(&mut session, "/", 10).await.unwrap().unwrap(), vec!["d"]);
    assert_eq!(read_dir(&mut session, "/d/a", 10).await.unwrap(), None);
    assert!(walk(&mut session, "/escaped").await.is_err());
}
