//! Content store collaborator
//!
//! The remote share is reached only through [`ContentStore`]: list a directory,
//! upload or download an object's full content, delete an object. Transport,
//! authentication and retries belong to the implementation.

pub mod directory;
pub mod memory;
pub mod remote;

use crate::error::StoreError;
use crate::types::{NodeKind, RemoteHandle};
use async_trait::async_trait;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use remote::RemoteShare;

/// Remote listing of one directory, fully drained across pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<String>,
    pub directories: Vec<String>,
}

impl Listing {
    /// Every entry with its kind: files first, then directories, each in
    /// listing order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, NodeKind)> {
        self.files
            .iter()
            .map(|name| (name.as_str(), NodeKind::File))
            .chain(
                self.directories
                    .iter()
                    .map(|name| (name.as_str(), NodeKind::Directory)),
            )
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remote share primitives consumed by the gateway core.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short backend label for logs.
    fn backend(&self) -> &'static str;

    /// Make sure the share exists. Returns whether it already existed.
    async fn prepare(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn list(&self, dir: &RemoteHandle) -> Result<Listing, StoreError>;

    /// Create or overwrite a file with `content`, or create a directory.
    async fn upload(
        &self,
        handle: &RemoteHandle,
        kind: NodeKind,
        content: &[u8],
    ) -> Result<(), StoreError>;

    async fn download(&self, handle: &RemoteHandle) -> Result<Vec<u8>, StoreError>;

    async fn delete(&self, handle: &RemoteHandle, kind: NodeKind) -> Result<(), StoreError>;
}
