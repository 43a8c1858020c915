//! Directory reconciliation against the remote share.
//!
//! Reconciliation is additive: names the remote lists that the cache lacks are
//! inserted (files first, then directories, each in listing order); cached
//! entries are never removed or refreshed here. Runs for the same directory are
//! serialized so the list/merge pair is never interleaved with another one.

use crate::concurrency::KeyedLocks;
use crate::error::{GatewayError, TreeError};
use crate::store::RemoteShare;
use crate::sync::diff;
use crate::tree::{Namespace, Node};
use futures::stream::{self, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of reconciling one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Names inserted into the cache, in insertion order.
    pub added: Vec<String>,
    /// Cached names the remote listing no longer (or not yet) contains.
    pub local_only: Vec<String>,
    /// Cached names confirmed by the remote listing.
    pub retained: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
    }
}

/// Content prefetch applied when a walk loads a directory's children.
#[derive(Debug, Clone, Copy)]
pub struct Prefetch {
    pub enabled: bool,
    pub concurrency: usize,
}

impl Default for Prefetch {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: 4,
        }
    }
}

pub struct SyncEngine {
    namespace: Arc<Namespace>,
    remote: Arc<RemoteShare>,
    locks: KeyedLocks,
    prefetch: Prefetch,
}

impl SyncEngine {
    pub fn new(namespace: Arc<Namespace>, remote: Arc<RemoteShare>, prefetch: Prefetch) -> Self {
        Self {
            namespace,
            remote,
            locks: KeyedLocks::new(),
            prefetch,
        }
    }

    /// Merge the remote listing of `dir` into the cache.
    pub async fn reconcile(&self, dir: &Node) -> Result<SyncReport, GatewayError> {
        let (report, _) = self.merge(dir).await?;
        Ok(report)
    }

    /// Reconcile `dir`, then fetch the content of the files it discovered.
    pub async fn load_children(&self, dir: &Node) -> Result<SyncReport, GatewayError> {
        let (report, added) = self.merge(dir).await?;
        if !self.prefetch.enabled {
            return Ok(report);
        }

        let files: Vec<Arc<Node>> = added.into_iter().filter(|node| !node.is_dir()).collect();
        if !files.is_empty() {
            debug!(dir = %dir.handle(), files = files.len(), "Prefetching content");
            let remote = &self.remote;
            stream::iter(files.into_iter().map(Ok::<_, GatewayError>))
                .try_for_each_concurrent(self.prefetch.concurrency.max(1), |node| async move {
                    remote.refresh(&node).await
                })
                .await?;
        }
        Ok(report)
    }

    /// Release the lock entry of a directory that left the namespace.
    pub fn forget(&self, dir: &Node) {
        self.locks.forget(dir.id());
    }

    /// Number of directories holding a reconcile lock entry.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    async fn merge(&self, dir: &Node) -> Result<(SyncReport, Vec<Arc<Node>>), GatewayError> {
        if !dir.is_dir() {
            return Err(TreeError::NotADirectory(dir.name().to_string()).into());
        }
        let _guard = self.locks.lock(dir.id()).await;
        if dir.is_detached() {
            return Err(TreeError::NotFound(dir.name().to_string()).into());
        }

        let listing = self.remote.list(dir).await?;
        let remote_names: Vec<&str> = listing.entries().map(|(name, _)| name).collect();
        let local = self.namespace.child_names(dir)?;

        let missing = diff::missing_locally(&local, &remote_names);
        let added = if missing.is_empty() {
            Vec::new()
        } else {
            self.namespace.insert_missing(dir, listing.entries())?
        };
        dir.touch();

        let report = SyncReport {
            added: added.iter().map(|node| node.name().to_string()).collect(),
            local_only: diff::missing_remotely(&local, &remote_names),
            retained: diff::intersect(&local, &remote_names),
        };
        if !report.added.is_empty() {
            info!(
                dir = %dir.handle(),
                added = report.added.len(),
                local_only = report.local_only.len(),
                "Reconciled directory"
            );
        }
        Ok((report, added))
    }
}
