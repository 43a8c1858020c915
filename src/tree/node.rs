//! Namespace entries and their cached content.
//!
//! A [`Node`] carries identity (id, name, kind, remote handle) and its content
//! cache. Structure (parent link, ordered children) lives in the
//! [`crate::tree::Namespace`] arena so that a node never owns its parent.

use crate::error::GatewayError;
use crate::types::{NodeId, NodeKind, RemoteHandle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};

/// Permission bits reported for every entry.
pub const PERMISSIONS: u32 = 0o777;

/// Plan 9 directory bit in a stat mode.
pub const DMDIR: u32 = 0x8000_0000;

/// Owner reported for every entry (user, group and last modifier).
pub const OWNER: &str = "none";

/// Last-known full content of a file.
#[derive(Debug, Default)]
pub struct Content {
    bytes: Vec<u8>,
    /// Modified locally since the last successful upload.
    dirty: bool,
    /// Holds remote content (or is known to have none).
    loaded: bool,
}

impl Content {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replace the buffer with freshly downloaded content.
    pub fn replace(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
        self.dirty = false;
        self.loaded = true;
    }

    /// Copy up to `len` bytes starting at `offset`.
    ///
    /// An offset at or past the end is a [`GatewayError::Boundary`]
    /// (end-of-stream).
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, GatewayError> {
        let size = self.bytes.len() as u64;
        if offset >= size {
            return Err(GatewayError::Boundary { offset, len: size });
        }
        let start = offset as usize;
        let end = start.saturating_add(len).min(self.bytes.len());
        Ok(self.bytes[start..end].to_vec())
    }

    /// Truncate at `offset` and append `data`, returning the previous buffer so
    /// the caller can restore it if the upload fails.
    ///
    /// Offsets past the end are rejected; the buffer is never zero-extended.
    pub fn overwrite_from(&mut self, offset: u64, data: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let size = self.bytes.len() as u64;
        if offset > size {
            return Err(GatewayError::Boundary { offset, len: size });
        }
        let previous = self.bytes.clone();
        self.bytes.truncate(offset as usize);
        self.bytes.extend_from_slice(data);
        self.dirty = true;
        Ok(previous)
    }

    /// Put back the buffer returned by [`Content::overwrite_from`].
    pub fn restore(&mut self, previous: Vec<u8>) {
        self.bytes = previous;
        self.dirty = false;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Remote has nothing newer than the cache.
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }
}

/// A single file or directory entry.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
    handle: RemoteHandle,
    content: Mutex<Content>,
    /// Mirror of the content length, readable without the content lock.
    size: AtomicU64,
    tracked: AtomicBool,
    detached: AtomicBool,
    last_access: parking_lot::Mutex<DateTime<Utc>>,
}

impl Node {
    /// `loaded` is true for entries created locally (nothing to fetch) and false
    /// for entries discovered in a remote listing.
    pub(crate) fn new(
        id: NodeId,
        name: String,
        kind: NodeKind,
        handle: RemoteHandle,
        loaded: bool,
    ) -> Self {
        let content = Content {
            loaded: loaded || kind.is_dir(),
            ..Content::default()
        };
        Self {
            id,
            name,
            kind,
            handle,
            content: Mutex::new(content),
            size: AtomicU64::new(0),
            tracked: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            last_access: parking_lot::Mutex::new(Utc::now()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn handle(&self) -> &RemoteHandle {
        &self.handle
    }

    /// Length of the cached content as of the last content mutation.
    pub fn cached_len(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked.load(Ordering::Acquire)
    }

    pub fn mark_tracked(&self) {
        self.tracked.store(true, Ordering::Release);
    }

    /// Removed from the namespace; handles held by in-flight requests are stale.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    pub(crate) fn mark_detached(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn last_access(&self) -> DateTime<Utc> {
        *self.last_access.lock()
    }

    pub fn touch(&self) {
        *self.last_access.lock() = Utc::now();
    }

    /// Lock the content for a read-modify-upload transaction.
    pub async fn lock_content(&self) -> ContentGuard<'_> {
        ContentGuard {
            node: self,
            guard: self.content.lock().await,
        }
    }
}

/// Exclusive access to a node's content; publishes the new length on drop.
pub struct ContentGuard<'a> {
    node: &'a Node,
    guard: MutexGuard<'a, Content>,
}

impl Deref for ContentGuard<'_> {
    type Target = Content;

    fn deref(&self) -> &Content {
        &self.guard
    }
}

impl DerefMut for ContentGuard<'_> {
    fn deref_mut(&mut self) -> &mut Content {
        &mut self.guard
    }
}

impl Drop for ContentGuard<'_> {
    fn drop(&mut self) {
        self.node
            .size
            .store(self.guard.len() as u64, Ordering::Release);
    }
}

/// Metadata snapshot of a node, as reported by stat and directory listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Content length for files, number of children for directories.
    pub size: u64,
    pub mode: u32,
    pub modified: DateTime<Utc>,
    pub uid: String,
    pub gid: String,
    pub muid: String,
}

impl NodeInfo {
    pub(crate) fn snapshot(node: &Node, child_count: usize) -> Self {
        let (size, mode) = match node.kind() {
            NodeKind::Directory => (child_count as u64, DMDIR | PERMISSIONS),
            NodeKind::File => (node.cached_len(), PERMISSIONS),
        };
        Self {
            id: node.id(),
            name: node.name().to_string(),
            kind: node.kind(),
            size,
            mode,
            modified: node.last_access(),
            uid: OWNER.to_string(),
            gid: OWNER.to_string(),
            muid: OWNER.to_string(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}
