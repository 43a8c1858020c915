use crate::tree::NodeInfo;
use crate::types::NodeKind;
use std::fmt;

/// A path-addressed operation from a client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Walk { path: String },
    Open { path: String },
    Stat { path: String },
    Create { dir: String, name: String, kind: NodeKind },
    Remove { path: String },
    Truncate { path: String, size: u64 },
    SetTimes { path: String },
    Read { path: String, offset: u64, count: usize },
    Write { path: String, offset: u64, data: Vec<u8> },
    ReadDir { path: String, batch: usize },
    Close { path: String },
}

impl Request {
    pub fn op(&self) -> &'static str {
        match self {
            Request::Walk { .. } => "walk",
            Request::Open { .. } => "open",
            Request::Stat { .. } => "stat",
            Request::Create { .. } => "create",
            Request::Remove { .. } => "remove",
            Request::Truncate { .. } => "truncate",
            Request::SetTimes { .. } => "settimes",
            Request::Read { .. } => "read",
            Request::Write { .. } => "write",
            Request::ReadDir { .. } => "readdir",
            Request::Close { .. } => "close",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Create { dir, name, kind } => {
                write!(f, "create {} {} in {}", kind, name, dir)
            }
            Request::Truncate { path, size } => write!(f, "truncate {} to {}", path, size),
            Request::Read {
                path,
                offset,
                count,
            } => write!(f, "read {} @{}+{}", path, offset, count),
            Request::Write { path, offset, data } => {
                write!(f, "write {} @{}+{}", path, offset, data.len())
            }
            Request::ReadDir { path, batch } => write!(f, "readdir {} x{}", path, batch),
            Request::Walk { path }
            | Request::Open { path }
            | Request::Stat { path }
            | Request::Remove { path }
            | Request::SetTimes { path }
            | Request::Close { path } => write!(f, "{} {}", self.op(), path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The node reached by a walk, open or create.
    Node(NodeInfo),
    Stat(NodeInfo),
    Data(Vec<u8>),
    Written(usize),
    /// Next batch of a directory enumeration, `None` once drained.
    Entries(Option<Vec<NodeInfo>>),
    Done,
}
