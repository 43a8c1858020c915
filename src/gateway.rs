//! Gateway core: the shared namespace plus every path-addressed operation.
//!
//! Each operation first reconciles the root ("root sync") so remote additions
//! are pulled in before the path is resolved. Paths are re-resolved by name on
//! every call; a node detached by a concurrent remove fails with `NotFound`
//! instead of resurrecting its remote object.

use crate::config::{Backend, GatewayConfig};
use crate::error::{ApiError, GatewayError, ProtocolError, RemoteOp, Stage, TreeError};
use crate::store::{ContentStore, DirectoryStore, MemoryStore, RemoteShare};
use crate::sync::{Prefetch, SyncEngine, SyncReport};
use crate::tree::{path, Namespace, Node, NodeInfo};
use crate::types::{NodeKind, RemoteHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub share: String,
    pub timeout: Duration,
    pub prefetch: Prefetch,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            share: "share9p".to_string(),
            timeout: Duration::from_millis(30_000),
            prefetch: Prefetch::default(),
        }
    }
}

impl From<&GatewayConfig> for GatewayOptions {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            share: config.share.clone(),
            timeout: Duration::from_millis(config.store.timeout_ms),
            prefetch: Prefetch {
                enabled: config.sync.prefetch_on_walk,
                concurrency: config.sync.prefetch_concurrency,
            },
        }
    }
}

/// Result of preparing the share at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    /// The share existed before startup.
    pub existed: bool,
    pub root: SyncReport,
}

pub struct Gateway {
    namespace: Arc<Namespace>,
    remote: Arc<RemoteShare>,
    sync: SyncEngine,
    options: GatewayOptions,
}

impl Gateway {
    pub fn new(store: Arc<dyn ContentStore>, options: GatewayOptions) -> Self {
        let namespace = Arc::new(Namespace::new());
        let remote = Arc::new(RemoteShare::new(store, options.timeout));
        let sync = SyncEngine::new(Arc::clone(&namespace), Arc::clone(&remote), options.prefetch);
        Self {
            namespace,
            remote,
            sync,
            options,
        }
    }

    /// Gateway over the store backend selected by `config`.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn ContentStore> = match config.store.backend {
            Backend::Memory => Arc::new(MemoryStore::new()),
            Backend::Directory => {
                let root = config.store.root.as_ref().ok_or_else(|| {
                    ApiError::ConfigError("store.root is required for the directory backend".to_string())
                })?;
                Arc::new(DirectoryStore::new(root, &config.share))
            }
        };
        Ok(Self::new(store, GatewayOptions::from(config)))
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    pub fn share(&self) -> &str {
        &self.options.share
    }

    pub fn backend(&self) -> &'static str {
        self.remote.store().backend()
    }

    /// Create the share if needed, then populate the root and download the
    /// files it lists.
    pub async fn bootstrap(&self) -> Result<Bootstrap, GatewayError> {
        let prepared =
            tokio::time::timeout(self.options.timeout, self.remote.store().prepare()).await;
        let existed = match prepared {
            Ok(result) => {
                result.map_err(|e| GatewayError::remote(RemoteOp::Upload, RemoteHandle::root(), e))?
            }
            Err(_) => {
                return Err(GatewayError::Timeout {
                    op: RemoteOp::Upload,
                    timeout_ms: self.options.timeout.as_millis() as u64,
                })
            }
        };
        if existed {
            info!(share = %self.options.share, backend = self.backend(), "Share found");
        } else {
            info!(share = %self.options.share, backend = self.backend(), "Share created");
        }

        let root = self.sync.load_children(&self.namespace.root()).await?;
        info!(entries = root.added.len(), "Root loaded");
        Ok(Bootstrap { existed, root })
    }

    pub async fn root_sync(&self) -> Result<SyncReport, GatewayError> {
        self.sync.reconcile(&self.namespace.root()).await
    }

    /// Resolve `path` without contacting the share.
    pub fn resolve(&self, path: &str) -> Result<Arc<Node>, GatewayError> {
        Ok(self.namespace.resolve(path)?)
    }

    async fn sync_and_resolve(&self, path: &str) -> Result<Arc<Node>, GatewayError> {
        self.root_sync().await?;
        self.resolve(path)
    }

    /// Resolve `path`; directories other than the root (already reconciled by
    /// the root sync) load their children.
    pub async fn walk(&self, path: &str) -> Result<Arc<Node>, GatewayError> {
        let node = self.sync_and_resolve(path).await?;
        if node.is_dir() && node.id() != self.namespace.root().id() {
            self.sync.load_children(&node).await?;
        }
        node.touch();
        Ok(node)
    }

    pub async fn open(&self, path: &str) -> Result<Arc<Node>, GatewayError> {
        let node = self.sync_and_resolve(path).await?;
        node.touch();
        Ok(node)
    }

    /// Metadata of `path`. Files nobody has closed yet are refreshed first so
    /// the reported size is current.
    pub async fn stat(&self, path: &str) -> Result<NodeInfo, GatewayError> {
        let node = self.sync_and_resolve(path).await?;
        if !node.is_dir() && !node.is_tracked() {
            self.remote.refresh(&node).await?;
        }
        Ok(self.namespace.info(&node))
    }

    /// Snapshot of a directory's children for enumeration.
    pub fn children(&self, dir: &Node) -> Result<Vec<NodeInfo>, GatewayError> {
        live(dir)?;
        Ok(self.namespace.child_infos(dir)?)
    }

    /// Local half of a create: root sync, then insert the single segment
    /// `name` under `dir`.
    async fn insert(&self, dir: &str, name: &str, kind: NodeKind) -> Result<Arc<Node>, GatewayError> {
        if !path::is_valid_name(name) {
            return Err(TreeError::InvalidName(name.to_string()).into());
        }
        self.root_sync().await?;
        let full = path::join(&path::clean(dir), name);
        Ok(self.namespace.insert(&full, kind)?)
    }

    /// Remote half of a create. A failed upload detaches the node again; the
    /// rollback is by identity so it never removes a node that replaced it.
    async fn materialize(&self, node: &Node) -> Result<(), GatewayError> {
        let uploaded = {
            let content = node.lock_content().await;
            self.remote.upload(node, &content).await
        };
        if let Err(err) = uploaded {
            warn!(handle = %node.handle(), error = %err, "Rolling back create");
            if let Err(rollback) = self.namespace.detach(node.id()) {
                debug!(error = %rollback, "Node already gone during rollback");
            }
            return Err(err);
        }
        debug!(handle = %node.handle(), kind = %node.kind(), "Created");
        Ok(())
    }

    /// Create `name` under `dir` locally and remotely. Failures carry the
    /// half that failed.
    pub async fn create(
        &self,
        dir: &str,
        name: &str,
        kind: NodeKind,
    ) -> Result<Arc<Node>, ProtocolError> {
        let node = self
            .insert(dir, name, kind)
            .await
            .map_err(|e| ProtocolError::new(Stage::Insert, e))?;
        self.materialize(&node)
            .await
            .map_err(|e| ProtocolError::new(Stage::RemoteCreate, e))?;
        Ok(node)
    }

    /// Remote half of a remove. Files discovered but never fetched are loaded
    /// first so an empty cache really means an empty file.
    async fn delete_remote(&self, node: &Node) -> Result<(), GatewayError> {
        let mut content = node.lock_content().await;
        live(node)?;
        self.remote.ensure_loaded(node, &mut content).await?;
        self.remote.delete(node, &content).await
    }

    /// Local half of a remove. Reconcile locks of every directory in the
    /// detached subtree are released.
    fn remove_local(&self, path: &str) -> Result<Arc<Node>, GatewayError> {
        let detached = self.namespace.remove_tree(path)?;
        for node in detached.iter().filter(|node| node.is_dir()) {
            self.sync.forget(node);
        }
        detached
            .into_iter()
            .next()
            .ok_or_else(|| TreeError::NotFound(path::clean(path)).into())
    }

    /// Delete remotely, then remove locally regardless of the remote outcome.
    /// The remote error wins when both fail. The root is never removed.
    pub async fn remove(&self, path: &str) -> Result<(), ProtocolError> {
        let cleaned = path::clean(path);
        if cleaned == "/" {
            return Err(ProtocolError::new(
                Stage::TreeRemove,
                TreeError::InvalidName(cleaned),
            ));
        }
        let node = self
            .sync_and_resolve(&cleaned)
            .await
            .map_err(|e| ProtocolError::new(Stage::TreeRemove, e))?;
        let remote = self.delete_remote(&node).await;
        let local = self.remove_local(&cleaned);
        remote.map_err(|e| ProtocolError::new(Stage::RemoteDelete, e))?;
        local
            .map(|_| ())
            .map_err(|e| ProtocolError::new(Stage::TreeRemove, e))
    }

    /// Read up to `count` bytes at `offset` after a full re-download.
    pub async fn read(&self, path: &str, offset: u64, count: usize) -> Result<Vec<u8>, GatewayError> {
        let node = self.sync_and_resolve(path).await?;
        if node.is_dir() {
            return Err(GatewayError::Unsupported("reading a directory"));
        }
        let mut content = node.lock_content().await;
        live(&node)?;
        self.remote.refresh_locked(&node, &mut content).await?;
        content.read_at(offset, count)
    }

    /// Truncate at `offset`, append `data`, upload the whole file.
    ///
    /// The content lock is held for the full read-modify-upload, and a failed
    /// upload restores the pre-write buffer.
    pub async fn write(&self, path: &str, offset: u64, data: &[u8]) -> Result<usize, GatewayError> {
        let node = self.sync_and_resolve(path).await?;
        if node.is_dir() {
            return Err(GatewayError::Unsupported("writing a directory"));
        }
        let mut content = node.lock_content().await;
        live(&node)?;
        self.remote.ensure_loaded(&node, &mut content).await?;
        let previous = content.overwrite_from(offset, data)?;
        if let Err(err) = self.remote.upload(&node, &content).await {
            content.restore(previous);
            return Err(err);
        }
        content.mark_clean();
        node.touch();
        Ok(data.len())
    }

    pub async fn truncate(&self, _path: &str, _size: u64) -> Result<(), GatewayError> {
        Err(GatewayError::Unsupported("truncate"))
    }

    /// Close marks the node tracked: stat stops refreshing it.
    pub fn close(&self, path: &str) {
        if let Ok(node) = self.resolve(path) {
            node.mark_tracked();
        }
    }

    /// Reconcile every directory under `path`, depth first.
    pub async fn load_recursive(&self, path: &str) -> Result<Arc<Node>, GatewayError> {
        let start = self.walk(path).await?;
        let mut pending = vec![Arc::clone(&start)];
        while let Some(dir) = pending.pop() {
            if !dir.is_dir() {
                continue;
            }
            self.sync.load_children(&dir).await?;
            pending.extend(self.namespace.children(&dir)?);
        }
        Ok(start)
    }
}

fn live(node: &Node) -> Result<(), GatewayError> {
    if node.is_detached() {
        return Err(TreeError::NotFound(node.handle().to_string()).into());
    }
    Ok(())
}
