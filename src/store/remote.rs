//! Node-level remote operations.
//!
//! Wraps a [`ContentStore`] with the deadline applied to every remote call and
//! with the content rules shared by all backends: empty files are never
//! uploaded (so deleting one is a no-op), directories have no content to fetch,
//! and a file missing remotely keeps its cached content.

use crate::error::{GatewayError, RemoteOp, StoreError};
use crate::store::{ContentStore, Listing};
use crate::tree::{Content, Node};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct RemoteShare {
    store: Arc<dyn ContentStore>,
    timeout: Duration,
}

impl RemoteShare {
    pub fn new(store: Arc<dyn ContentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    async fn call<T, F>(&self, op: RemoteOp, node: &Node, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| GatewayError::remote(op, node.handle(), e)),
            Err(_) => Err(GatewayError::Timeout {
                op,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    pub async fn list(&self, dir: &Node) -> Result<Listing, GatewayError> {
        self.call(RemoteOp::List, dir, self.store.list(dir.handle()))
            .await
    }

    /// Materialize `node` remotely with its full current content.
    pub async fn upload(&self, node: &Node, content: &Content) -> Result<(), GatewayError> {
        if !node.is_dir() && content.is_empty() {
            debug!(handle = %node.handle(), "Skipping upload of empty file");
            return Ok(());
        }
        debug!(handle = %node.handle(), bytes = content.len(), "Uploading");
        self.call(
            RemoteOp::Upload,
            node,
            self.store
                .upload(node.handle(), node.kind(), content.bytes()),
        )
        .await
    }

    /// Replace the cached content with the full remote content.
    pub async fn refresh_locked(
        &self,
        node: &Node,
        content: &mut Content,
    ) -> Result<(), GatewayError> {
        if node.is_dir() {
            return Ok(());
        }
        debug!(handle = %node.handle(), "Downloading");
        let fetched = tokio::time::timeout(self.timeout, self.store.download(node.handle())).await;
        match fetched {
            Ok(Ok(bytes)) => content.replace(bytes),
            Ok(Err(StoreError::NotFound(_))) => {
                // Never uploaded (empty) or removed by another writer.
                debug!(handle = %node.handle(), "No remote content, keeping cache");
                content.mark_loaded();
            }
            Ok(Err(e)) => return Err(GatewayError::remote(RemoteOp::Download, node.handle(), e)),
            Err(_) => {
                return Err(GatewayError::Timeout {
                    op: RemoteOp::Download,
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
        node.touch();
        Ok(())
    }

    pub async fn refresh(&self, node: &Node) -> Result<(), GatewayError> {
        if node.is_dir() {
            return Ok(());
        }
        let mut content = node.lock_content().await;
        self.refresh_locked(node, &mut content).await
    }

    /// Load content once for nodes discovered remotely but never fetched.
    pub async fn ensure_loaded(&self, node: &Node, content: &mut Content) -> Result<(), GatewayError> {
        if content.is_loaded() {
            return Ok(());
        }
        self.refresh_locked(node, content).await
    }

    /// Delete `node` remotely. Empty files were never uploaded, so there is
    /// nothing to delete.
    pub async fn delete(&self, node: &Node, content: &Content) -> Result<(), GatewayError> {
        if !node.is_dir() && content.is_empty() {
            debug!(handle = %node.handle(), "Skipping delete of empty file");
            return Ok(());
        }
        self.call(
            RemoteOp::Delete,
            node,
            self.store.delete(node.handle(), node.kind()),
        )
        .await
    }
}
