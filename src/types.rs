//! Core types shared by the namespace, the sync engine and the content stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// NodeId: process-unique identifier of a namespace entry, never reused.
pub type NodeId = u64;

/// Kind of a namespace entry, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn is_dir(self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => write!(f, "file"),
            NodeKind::Directory => write!(f, "dir"),
        }
    }
}

/// RemoteHandle: key a content store uses to address an object.
///
/// Derived from the parent handle and the entry name; the root is the empty key
/// and every other handle is the `/`-joined relative path inside the share.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RemoteHandle(String);

impl RemoteHandle {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Handle of the containing directory; the root is its own parent.
    pub fn parent(&self) -> Self {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => Self(parent.to_string()),
            None => Self::root(),
        }
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<share root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
