use crate::support::*;
use share9p::protocol::Request;
use share9p::types::NodeKind;

#[tokio::test]
async fn draining_five_children_in_batches_of_two() {
    let harness = Harness::new();
    for name in ["a", "b", "c", "d", "e"] {
        harness.store.seed_file(&format!("/dir/{}", name), b"x");
    }
    let mut session = harness.session();
    walk(&mut session, "/dir").await.unwrap();
    session
        .dispatch(Request::Open {
            path: "/dir".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(read_dir(&mut session, "/dir", 2).await.unwrap().unwrap(), vec!["a", "b"]);
    assert_eq!(read_dir(&mut session, "/dir", 2).await.unwrap().unwrap(), vec!["c", "d"]);
    assert_eq!(read_dir(&mut session, "/dir", 2).await.unwrap().unwrap(), vec!["e"]);
    assert_eq!(read_dir(&mut session, "/dir", 2).await.unwrap(), None);
    // Not restartable without a reload.
    assert_eq!(read_dir(&mut session, "/dir", 2).await.unwrap(), None);

    session
        .dispatch(Request::Open {
            path: "/dir".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(read_dir(&mut session, "/dir", 10).await.unwrap().unwrap().len(), 5);
}

#[tokio::test]
async fn close_drops_the_cursor() {
    let harness = Harness::new();
    harness.store.seed_file("/dir/a", b"x");
    let mut session = harness.session();
    walk(&mut session, "/dir").await.unwrap();

    assert_eq!(read_dir(&mut session, "/dir", 5).await.unwrap().unwrap(), vec!["a"]);
    assert_eq!(read_dir(&mut session, "/dir", 5).await.unwrap(), None);
    session
        .dispatch(Request::Close {
            path: "/dir".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(read_dir(&mut session, "/dir", 5).await.unwrap().unwrap(), vec!["a"]);
}

#[tokio::test]
async fn snapshot_ignores_entries_added_after_open() {
    let harness = Harness::new();
    let mut session = harness.session();
    create(&mut session, "/", "one", NodeKind::File).await.unwrap();
    session
        .dispatch(Request::Open {
            path: "/".to_string(),
        })
        .await
        .unwrap();

    create(&mut session, "/", "two", NodeKind::File).await.unwrap();
    assert_eq!(read_dir(&mut session, "/", 10).await.unwrap().unwrap(), vec!["one"]);
}

#[tokio::test]
async fn cursors_are_per_session() {
    let harness = Harness::new();
    harness.store.seed_file("/a", b"1");
    harness.store.seed_file("/b", b"2");
    let mut first = harness.session();
    let mut second = harness.session();

    assert_eq!(read_dir(&mut first, "/", 1).await.unwrap().unwrap(), vec!["a"]);
    assert_eq!(read_dir(&mut second, "/", 5).await.unwrap().unwrap(), vec!["a", "b"]);
    assert_eq!(read_dir(&mut first, "/", 1).await.unwrap().unwrap(), vec!["b"]);
}
