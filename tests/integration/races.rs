use crate::support::*;
use share9p::error::ErrorKind;
use share9p::types::NodeKind;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_of_one_name_have_one_winner() {
    let harness = Arc::new(Harness::new());
    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                let mut session = harness.session();
                create(&mut session, "/", "same", NodeKind::File).await
            })
        })
        .collect();

    let mut wins = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => wins += 1,
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::AlreadyExists);
                conflicts += 1;
            }
        }
    }
    assert_eq!((wins, conflicts), (1, 1));
    let root = harness.gateway.namespace().root();
    assert_eq!(
        harness.gateway.namespace().child_names(&root).unwrap(),
        vec!["same"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sessions_walking_one_directory_see_each_entry_once() {
    let harness = Arc::new(Harness::new());
    for i in 0..12 {
        harness.store.seed_file(&format!("/shared/f{}", i), b"data");
    }

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                let mut session = harness.session();
                walk(&mut session, "/shared").await.unwrap();
                read_dir(&mut session, "/shared", 100).await.unwrap()
            })
        })
        .collect();
    for task in tasks {
        let names = task.await.unwrap().unwrap_or_default();
        // A session can snapshot the directory before another finishes loading.
        assert!(names.len() <= 12);
    }

    let mut session = harness.session();
    let names = read_dir(&mut session, "/shared", 100).await.unwrap().unwrap();
    assert_eq!(names.len(), 12);
    let mut unique = names.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_on_different_files_do_not_interfere() {
    let harness = Arc::new(Harness::new());
    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                let mut session = harness.session();
                let name = format!("file{}", i);
                create(&mut session, "/", &name, NodeKind::File).await.unwrap();
                let body = format!("body of {}", i);
                write(&mut session, &format!("/{}", name), 0, body.as_bytes())
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    for i in 0..6 {
        let expected = format!("body of {}", i);
        assert_eq!(
            harness.store.content(&format!("/file{}", i)).unwrap(),
            expected.as_bytes()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_on_one_file_never_interleave() {
    let harness = Arc::new(Harness::new());
    let mut session = harness.session();
    create(&mut session, "/", "shared.bin", NodeKind::File)
        .await
        .unwrap();

    let buffers: Vec<Vec<u8>> = (0..8u8).map(|i| vec![b'a' + i; 4096]).collect();
    let tasks: Vec<_> = buffers
        .iter()
        .cloned()
        .map(|buffer| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                let mut session = harness.session();
                for _ in 0..5 {
                    write(&mut session, "/shared.bin", 0, &buffer).await.unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let remote = harness.store.content("/shared.bin").unwrap();
    assert!(buffers.contains(&remote));
    let local = read(&mut session, "/shared.bin", 0, 8192).await.unwrap();
    assert_eq!(local, remote);
}
