//! Content store backed by a local directory.
//!
//! The share is a directory under the configured root, for example a mounted
//! cloud file share. Listings are sorted by name.

use crate::error::StoreError;
use crate::store::{ContentStore, Listing};
use crate::types::{NodeKind, RemoteHandle};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

pub struct DirectoryStore {
    share_root: PathBuf,
}

impl DirectoryStore {
    /// Store for the share named `share` under `root`.
    pub fn new(root: impl AsRef<Path>, share: &str) -> Self {
        Self {
            share_root: root.as_ref().join(share),
        }
    }

    pub fn share_root(&self) -> &Path {
        &self.share_root
    }

    fn path_for(&self, handle: &RemoteHandle) -> PathBuf {
        if handle.is_root() {
            self.share_root.clone()
        } else {
            self.share_root.join(handle.as_str())
        }
    }
}

fn map_io(handle: &RemoteHandle, err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(handle.to_string())
    } else {
        StoreError::Io(err)
    }
}

#[async_trait]
impl ContentStore for DirectoryStore {
    fn backend(&self) -> &'static str {
        "directory"
    }

    async fn prepare(&self) -> Result<bool, StoreError> {
        if fs::metadata(&self.share_root).await.is_ok() {
            return Ok(true);
        }
        fs::create_dir_all(&self.share_root).await?;
        debug!(share = ?self.share_root, "Created share directory");
        Ok(false)
    }

    async fn list(&self, dir: &RemoteHandle) -> Result<Listing, StoreError> {
        let mut entries = fs::read_dir(self.path_for(dir))
            .await
            .map_err(|e| map_io(dir, e))?;
        let mut listing = Listing::default();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(entry = ?entry.path(), "Skipping entry with non UTF-8 name");
                continue;
            };
            if entry.file_type().await?.is_dir() {
                listing.directories.push(name);
            } else {
                listing.files.push(name);
            }
        }
        listing.files.sort();
        listing.directories.sort();
        Ok(listing)
    }

    async fn upload(
        &self,
        handle: &RemoteHandle,
        kind: NodeKind,
        content: &[u8],
    ) -> Result<(), StoreError> {
        let path = self.path_for(handle);
        match kind {
            NodeKind::File => fs::write(&path, content)
                .await
                .map_err(|e| map_io(handle, e)),
            NodeKind::Directory => match fs::create_dir(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
                Err(e) => Err(map_io(handle, e)),
            },
        }
    }

    async fn download(&self, handle: &RemoteHandle) -> Result<Vec<u8>, StoreError> {
        fs::read(self.path_for(handle))
            .await
            .map_err(|e| map_io(handle, e))
    }

    async fn delete(&self, handle: &RemoteHandle, kind: NodeKind) -> Result<(), StoreError> {
        let path = self.path_for(handle);
        let result = match kind {
            NodeKind::File => fs::remove_file(&path).await,
            NodeKind::Directory => fs::remove_dir(&path).await,
        };
        result.map_err(|e| map_io(handle, e))
    }
}
