use crate::support::*;
use share9p::error::RemoteOp;
use share9p::types::NodeKind;

#[tokio::test]
async fn root_listing_puts_files_before_directories() {
    let harness = Harness::new();
    harness.store.seed_dir("/zeta");
    harness.store.seed_file("/b.txt", b"b");
    harness.store.seed_file("/a.txt", b"a");
    let mut session = harness.session();

    let names = read_dir(&mut session, "/", 10).await.unwrap().unwrap();
    assert_eq!(names, vec!["b.txt", "a.txt", "zeta"]);
}

#[tokio::test]
async fn repeated_requests_do_not_duplicate_entries() {
    let harness = Harness::new();
    harness.store.seed_file("/a.txt", b"a");
    harness.store.seed_dir("/sub");
    let mut session = harness.session();

    for _ in 0..3 {
        walk(&mut session, "/a.txt").await.unwrap();
        stat(&mut session, "/").await.unwrap();
    }
    assert_eq!(stat(&mut session, "/").await.unwrap().size, 2);
    assert_eq!(harness.gateway.namespace().total_count(), 3);
}

#[tokio::test]
async fn remote_additions_appear_on_the_next_request() {
    let harness = Harness::new();
    let mut session = harness.session();
    assert_eq!(read_dir(&mut session, "/", 10).await.unwrap(), None);

    harness.store.seed_file("/late.txt", b"late");
    let info = walk(&mut session, "/late.txt").await.unwrap();
    assert_eq!(info.kind, NodeKind::File);
    assert_eq!(read(&mut session, "/late.txt", 0, 10).await.unwrap(), b"late");
}

#[tokio::test]
async fn every_request_lists_the_root_first() {
    let harness = Harness::new();
    let mut session = harness.session();
    let before = harness.store.calls(RemoteOp::List);

    stat(&mut session, "/").await.unwrap();
    walk(&mut session, "/").await.unwrap();
    assert_eq!(harness.store.calls(RemoteOp::List), before + 2);
}

#[tokio::test]
async fn remote_deletions_are_not_pruned() {
    let harness = Harness::new();
    harness.store.seed_file("/gone.txt", b"x");
    let mut session = harness.session();
    assert_eq!(stat(&mut session, "/gone.txt").await.unwrap().size, 1);

    harness.store.remove_remote("/gone.txt");
    let info = walk(&mut session, "/gone.txt").await.unwrap();
    assert_eq!(info.size, 1);
}

#[tokio::test]
async fn subdirectories_load_only_when_walked() {
    let harness = Harness::new();
    harness.store.seed_file("/sub/inner.txt", b"x");
    let mut session = harness.session();

    stat(&mut session, "/").await.unwrap();
    let sub = harness.gateway.namespace().resolve("/sub").unwrap();
    assert_eq!(harness.gateway.namespace().child_count(&sub), 0);

    walk(&mut session, "/sub").await.unwrap();
    assert_eq!(stat(&mut session, "/sub").await.unwrap().size, 1);
}
