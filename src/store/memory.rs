//! In-process content store.
//!
//! Keeps directory entries in insertion order so listings are deterministic.
//! Supports fault injection and artificial latency, and lets callers mutate the
//! share behind the gateway's back the way another writer would.

use crate::error::{RemoteOp, StoreError};
use crate::store::{ContentStore, Listing};
use crate::types::{NodeKind, RemoteHandle};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
struct Share {
    /// Directory handle -> ordered entries.
    dirs: HashMap<String, Vec<(String, NodeKind)>>,
    files: HashMap<String, Vec<u8>>,
}

impl Share {
    fn new() -> Self {
        let mut share = Self::default();
        share.dirs.insert(String::new(), Vec::new());
        share
    }

    fn add_entry(&mut self, handle: &RemoteHandle, kind: NodeKind) -> Result<(), StoreError> {
        let parent = handle.parent();
        let name = handle
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let entries = self
            .dirs
            .get_mut(parent.as_str())
            .ok_or_else(|| StoreError::NotFound(parent.to_string()))?;
        if !entries.iter().any(|(existing, _)| *existing == name) {
            entries.push((name, kind));
        }
        Ok(())
    }

    fn remove_entry(&mut self, handle: &RemoteHandle) {
        let parent = handle.parent();
        let name = handle.as_str().rsplit('/').next().unwrap_or_default();
        if let Some(entries) = self.dirs.get_mut(parent.as_str()) {
            entries.retain(|(existing, _)| existing != name);
        }
    }

    fn ensure_dirs(&mut self, handle: &RemoteHandle) {
        let mut current = RemoteHandle::root();
        for segment in handle.as_str().split('/').filter(|s| !s.is_empty()) {
            current = current.child(segment);
            if !self.dirs.contains_key(current.as_str()) {
                let _ = self.add_entry(&current, NodeKind::Directory);
                self.dirs.insert(current.as_str().to_string(), Vec::new());
            }
        }
    }
}

struct Fault {
    op: RemoteOp,
    handle: Option<String>,
    message: String,
}

#[derive(Default)]
struct Calls {
    list: usize,
    upload: usize,
    download: usize,
    delete: usize,
}

/// Content store held entirely in memory.
pub struct MemoryStore {
    share: RwLock<Share>,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<Calls>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            share: RwLock::new(Share::new()),
            faults: Mutex::new(Vec::new()),
            calls: Mutex::new(Calls::default()),
            latency: Mutex::new(None),
        }
    }

    /// Put a file on the share, creating missing parent directories.
    pub fn seed_file(&self, path: &str, content: &[u8]) {
        let handle = handle_for(path);
        let mut share = self.share.write();
        share.ensure_dirs(&handle.parent());
        let _ = share.add_entry(&handle, NodeKind::File);
        share
            .files
            .insert(handle.as_str().to_string(), content.to_vec());
    }

    /// Put a directory on the share, creating missing parents.
    pub fn seed_dir(&self, path: &str) {
        self.share.write().ensure_dirs(&handle_for(path));
    }

    /// Delete an object directly on the share.
    pub fn remove_remote(&self, path: &str) {
        let handle = handle_for(path);
        let mut share = self.share.write();
        share.remove_entry(&handle);
        share.files.remove(handle.as_str());
        let prefix = format!("{}/", handle.as_str());
        share
            .dirs
            .retain(|key, _| key != handle.as_str() && !key.starts_with(&prefix));
    }

    /// Remote content of a file, if present.
    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.share.read().files.get(handle_for(path).as_str()).cloned()
    }

    pub fn exists(&self, path: &str) -> bool {
        let handle = handle_for(path);
        let share = self.share.read();
        share.files.contains_key(handle.as_str()) || share.dirs.contains_key(handle.as_str())
    }

    /// Fail the next `op`, optionally only for the object at `path`.
    pub fn fail_next(&self, op: RemoteOp, path: Option<&str>, message: &str) {
        self.faults.lock().push(Fault {
            op,
            handle: path.map(|p| handle_for(p).as_str().to_string()),
            message: message.to_string(),
        });
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of calls made so far for `op`.
    pub fn calls(&self, op: RemoteOp) -> usize {
        let calls = self.calls.lock();
        match op {
            RemoteOp::List => calls.list,
            RemoteOp::Upload => calls.upload,
            RemoteOp::Download => calls.download,
            RemoteOp::Delete => calls.delete,
        }
    }

    async fn enter(&self, op: RemoteOp, handle: &RemoteHandle) -> Result<(), StoreError> {
        {
            let mut calls = self.calls.lock();
            match op {
                RemoteOp::List => calls.list += 1,
                RemoteOp::Upload => calls.upload += 1,
                RemoteOp::Download => calls.download += 1,
                RemoteOp::Delete => calls.delete += 1,
            }
        }
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut faults = self.faults.lock();
        let position = faults.iter().position(|fault| {
            fault.op == op
                && fault
                    .handle
                    .as_deref()
                    .map_or(true, |h| h == handle.as_str())
        });
        match position {
            Some(index) => Err(StoreError::Rejected(faults.remove(index).message)),
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn handle_for(path: &str) -> RemoteHandle {
    path.split('/')
        .filter(|s| !s.is_empty())
        .fold(RemoteHandle::root(), |handle, name| handle.child(name))
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, dir: &RemoteHandle) -> Result<Listing, StoreError> {
        self.enter(RemoteOp::List, dir).await?;
        let share = self.share.read();
        let entries = share
            .dirs
            .get(dir.as_str())
            .ok_or_else(|| StoreError::NotFound(dir.to_string()))?;
        let mut listing = Listing::default();
        for (name, kind) in entries {
            match kind {
                NodeKind::File => listing.files.push(name.clone()),
                NodeKind::Directory => listing.directories.push(name.clone()),
            }
        }
        Ok(listing)
    }

    async fn upload(
        &self,
        handle: &RemoteHandle,
        kind: NodeKind,
        content: &[u8],
    ) -> Result<(), StoreError> {
        self.enter(RemoteOp::Upload, handle).await?;
        let mut share = self.share.write();
        share.add_entry(handle, kind)?;
        match kind {
            NodeKind::File => {
                share
                    .files
                    .insert(handle.as_str().to_string(), content.to_vec());
            }
            NodeKind::Directory => {
                share
                    .dirs
                    .entry(handle.as_str().to_string())
                    .or_default();
            }
        }
        Ok(())
    }

    async fn download(&self, handle: &RemoteHandle) -> Result<Vec<u8>, StoreError> {
        self.enter(RemoteOp::Download, handle).await?;
        self.share
            .read()
            .files
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))
    }

    async fn delete(&self, handle: &RemoteHandle, kind: NodeKind) -> Result<(), StoreError> {
        self.enter(RemoteOp::Delete, handle).await?;
        let mut share = self.share.write();
        match kind {
            NodeKind::File => {
                if share.files.remove(handle.as_str()).is_none() {
                    return Err(StoreError::NotFound(handle.to_string()));
                }
            }
            NodeKind::Directory => {
                match share.dirs.get(handle.as_str()) {
                    None => return Err(StoreError::NotFound(handle.to_string())),
                    Some(entries) if !entries.is_empty() => {
                        return Err(StoreError::Rejected(format!(
                            "directory {} is not empty",
                            handle
                        )))
                    }
                    Some(_) => {}
                }
                share.dirs.remove(handle.as_str());
            }
        }
        share.remove_entry(handle);
        Ok(())
    }
}
