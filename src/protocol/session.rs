//! Per-client request dispatch.

use crate::error::{GatewayError, ProtocolError, Stage, TreeError};
use crate::gateway::Gateway;
use crate::protocol::cursor::DirCursor;
use crate::protocol::request::{Request, Response};
use crate::tree::path;
use crate::types::NodeKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// One client session. Requests are handled one at a time in arrival order;
/// sessions run concurrently against the shared gateway.
pub struct Session {
    id: u64,
    gateway: Arc<Gateway>,
    /// Enumeration cursors keyed by cleaned directory path.
    cursors: HashMap<String, DirCursor>,
}

impl Session {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let id = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        debug!(session = id, "Session opened");
        Self {
            id,
            gateway,
            cursors: HashMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub async fn dispatch(&mut self, request: Request) -> Result<Response, ProtocolError> {
        debug!(session = self.id, request = %request, "Dispatching");
        let op = request.op();
        let result = self.handle(request).await;
        if let Err(err) = &result {
            warn!(
                session = self.id,
                op,
                retryable = err.is_retryable(),
                error = %err,
                "Request failed"
            );
        }
        result
    }

    async fn handle(&mut self, request: Request) -> Result<Response, ProtocolError> {
        let gateway = Arc::clone(&self.gateway);
        match request {
            Request::Walk { path } => {
                let node = gateway.walk(&path).await.map_err(at(Stage::Walk))?;
                Ok(Response::Node(gateway.namespace().info(&node)))
            }
            Request::Open { path } => {
                let node = gateway.open(&path).await.map_err(at(Stage::Open))?;
                if node.is_dir() {
                    let cursor = DirCursor::new(gateway.children(&node).map_err(at(Stage::Open))?);
                    self.cursors.insert(path::clean(&path), cursor);
                }
                Ok(Response::Node(gateway.namespace().info(&node)))
            }
            Request::Stat { path } => {
                let info = gateway.stat(&path).await.map_err(at(Stage::Stat))?;
                Ok(Response::Stat(info))
            }
            Request::Create { dir, name, kind } => self.create(&dir, &name, kind).await,
            Request::Remove { path } => self.remove(&path).await,
            Request::Truncate { path, size } => {
                gateway
                    .truncate(&path, size)
                    .await
                    .map_err(at(Stage::Truncate))?;
                Ok(Response::Done)
            }
            Request::SetTimes { .. } => Ok(Response::Done),
            Request::Read {
                path,
                offset,
                count,
            } => {
                let data = gateway
                    .read(&path, offset, count)
                    .await
                    .map_err(at(Stage::Read))?;
                Ok(Response::Data(data))
            }
            Request::Write { path, offset, data } => {
                let written = gateway
                    .write(&path, offset, &data)
                    .await
                    .map_err(at(Stage::Write))?;
                Ok(Response::Written(written))
            }
            Request::ReadDir { path, batch } => self.read_dir(&path, batch).await,
            Request::Close { path } => {
                gateway.close(&path);
                self.cursors.remove(&path::clean(&path));
                Ok(Response::Done)
            }
        }
    }

    async fn create(
        &mut self,
        dir: &str,
        name: &str,
        kind: NodeKind,
    ) -> Result<Response, ProtocolError> {
        let node = self.gateway.create(dir, name, kind).await?;
        Ok(Response::Node(self.gateway.namespace().info(&node)))
    }

    async fn remove(&mut self, path: &str) -> Result<Response, ProtocolError> {
        // The local entry is gone even when the remote delete failed.
        let removed = self.gateway.remove(path).await;
        let key = path::clean(path);
        if key != "/" {
            self.cursors.remove(&key);
        }
        removed?;
        Ok(Response::Done)
    }

    async fn read_dir(&mut self, dir: &str, batch: usize) -> Result<Response, ProtocolError> {
        let key = path::clean(dir);
        if !self.cursors.contains_key(&key) {
            let node = self.gateway.open(&key).await.map_err(at(Stage::ReadDir))?;
            if !node.is_dir() {
                return Err(ProtocolError::new(Stage::ReadDir, TreeError::NotADirectory(key)));
            }
            let entries = self.gateway.children(&node).map_err(at(Stage::ReadDir))?;
            self.cursors.insert(key.clone(), DirCursor::new(entries));
        }
        let batch = self
            .cursors
            .get_mut(&key)
            .and_then(|cursor| cursor.next_batch(batch));
        Ok(Response::Entries(batch))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(session = self.id, "Session closed");
    }
}

fn at(stage: Stage) -> impl Fn(GatewayError) -> ProtocolError {
    move |err| ProtocolError::new(stage, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, RemoteOp};
    use crate::gateway::GatewayOptions;
    use crate::store::{ContentStore, MemoryStore};

    fn session(store: &Arc<MemoryStore>) -> Session {
        let gateway = Gateway::new(
            Arc::clone(store) as Arc<dyn ContentStore>,
            GatewayOptions::default(),
        );
        Session::new(Arc::new(gateway))
    }

    #[tokio::test]
    async fn errors_carry_their_stage() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(&store);

        let err = session
            .dispatch(Request::Walk {
                path: "/missing".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "tree walk failed → could not find file \"/missing\""
        );

        store.fail_next(RemoteOp::Upload, None, "denied");
        let err = session
            .dispatch(Request::Create {
                dir: "/".to_string(),
                name: "d".to_string(),
                kind: NodeKind::Directory,
            })
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::RemoteCreate);
        assert_eq!(err.kind(), ErrorKind::RemoteUploadFailed);
    }

    #[tokio::test]
    async fn readdir_without_open_loads_lazily() {
        let store = Arc::new(MemoryStore::new());
        store.seed_file("/a", b"1");
        store.seed_file("/b", b"2");
        let mut session = session(&store);

        let first = session
            .dispatch(Request::ReadDir {
                path: "/".to_string(),
                batch: 10,
            })
            .await
            .unwrap();
        match first {
            Response::Entries(Some(entries)) => assert_eq!(entries.len(), 2),
            other => panic!("unexpected response {:?}", other),
        }
        let end = session
            .dispatch(Request::ReadDir {
                path: "/".to_string(),
                batch: 10,
            })
            .await
            .unwrap();
        assert_eq!(end, Response::Entries(None));
    }

    #[tokio::test]
    async fn readdir_on_a_file_fails() {
        let store = Arc::new(MemoryStore::new());
        store.seed_file("/a", b"1");
        let mut session = session(&store);
        let err = session
            .dispatch(Request::ReadDir {
                path: "/a".to_string(),
                batch: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::ReadDir);
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
    }

    #[tokio::test]
    async fn settimes_always_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(&store);
        let response = session
            .dispatch(Request::SetTimes {
                path: "/whatever".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response, Response::Done);
    }
}
