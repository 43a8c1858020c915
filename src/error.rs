//! Error types
//!
//! Layered the way requests flow: [`TreeError`] for namespace failures,
//! [`StoreError`] for the content store collaborator, [`GatewayError`] for core
//! operations, [`ProtocolError`] for a failed request (stage + cause) and
//! [`ApiError`] for process-level failures.

use std::fmt;
use std::io;
use thiserror::Error;

/// Namespace (tree) failures. Purely local; never involve the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("could not find file \"{0}\"")]
    NotFound(String),

    #[error("could not find parent directory \"{parent}\"")]
    ParentNotFound { parent: String },

    #[error("file \"{0}\" exists")]
    AlreadyExists(String),

    #[error("could not find child \"{name}\" in \"{parent}\"")]
    ChildNotFound { parent: String, name: String },

    #[error("\"{0}\" is a file, not a directory")]
    NotADirectory(String),

    #[error("invalid entry name {0:?}")]
    InvalidName(String),
}

/// Failures reported by a [`crate::store::ContentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote object \"{0}\" not found")]
    NotFound(String),

    #[error("remote storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("remote storage rejected the request: {0}")]
    Rejected(String),
}

/// Remote primitive a failure or deadline refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    List,
    Upload,
    Download,
    Delete,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOp::List => "list",
            RemoteOp::Upload => "upload",
            RemoteOp::Download => "download",
            RemoteOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Classification of every failure the core can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ParentNotFound,
    AlreadyExists,
    ChildNotFound,
    NotADirectory,
    InvalidName,
    RemoteListFailed,
    RemoteUploadFailed,
    RemoteDownloadFailed,
    RemoteDeleteFailed,
    Boundary,
    Unsupported,
    Timeout,
}

/// Core gateway failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("remote list of {handle} failed → {source}")]
    RemoteListFailed {
        handle: String,
        #[source]
        source: StoreError,
    },

    #[error("remote upload of {handle} failed → {source}")]
    RemoteUploadFailed {
        handle: String,
        #[source]
        source: StoreError,
    },

    #[error("file download of {handle} failed → {source}")]
    RemoteDownloadFailed {
        handle: String,
        #[source]
        source: StoreError,
    },

    #[error("remote delete of {handle} failed → {source}")]
    RemoteDeleteFailed {
        handle: String,
        #[source]
        source: StoreError,
    },

    /// Write offset past the end of content, or read offset at/after the end.
    #[error("offset {offset} is outside content of length {len}")]
    Boundary { offset: u64, len: u64 },

    #[error("{0} is not supported")]
    Unsupported(&'static str),

    #[error("remote {op} did not complete within {timeout_ms}ms")]
    Timeout { op: RemoteOp, timeout_ms: u64 },
}

impl GatewayError {
    pub fn remote(op: RemoteOp, handle: impl fmt::Display, source: StoreError) -> Self {
        let handle = handle.to_string();
        match op {
            RemoteOp::List => GatewayError::RemoteListFailed { handle, source },
            RemoteOp::Upload => GatewayError::RemoteUploadFailed { handle, source },
            RemoteOp::Download => GatewayError::RemoteDownloadFailed { handle, source },
            RemoteOp::Delete => GatewayError::RemoteDeleteFailed { handle, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Tree(err) => match err {
                TreeError::NotFound(_) => ErrorKind::NotFound,
                TreeError::ParentNotFound { .. } => ErrorKind::ParentNotFound,
                TreeError::AlreadyExists(_) => ErrorKind::AlreadyExists,
                TreeError::ChildNotFound { .. } => ErrorKind::ChildNotFound,
                TreeError::NotADirectory(_) => ErrorKind::NotADirectory,
                TreeError::InvalidName(_) => ErrorKind::InvalidName,
            },
            GatewayError::RemoteListFailed { .. } => ErrorKind::RemoteListFailed,
            GatewayError::RemoteUploadFailed { .. } => ErrorKind::RemoteUploadFailed,
            GatewayError::RemoteDownloadFailed { .. } => ErrorKind::RemoteDownloadFailed,
            GatewayError::RemoteDeleteFailed { .. } => ErrorKind::RemoteDeleteFailed,
            GatewayError::Boundary { .. } => ErrorKind::Boundary,
            GatewayError::Unsupported(_) => ErrorKind::Unsupported,
            GatewayError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Whether the client may reasonably retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. })
    }
}

/// Processing stage named in an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Walk,
    Open,
    Stat,
    Insert,
    RemoteCreate,
    RemoteDelete,
    TreeRemove,
    Truncate,
    Read,
    Write,
    ReadDir,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Stage::Walk => "tree walk failed",
            Stage::Open => "open failed",
            Stage::Stat => "stat failed",
            Stage::Insert => "tree insert failed",
            Stage::RemoteCreate => "remote create failed",
            Stage::RemoteDelete => "remote delete failed",
            Stage::TreeRemove => "tree remove failed",
            Stage::Truncate => "truncate failed",
            Stage::Read => "read failed",
            Stage::Write => "write failed",
            Stage::ReadDir => "readdir failed",
        };
        f.write_str(text)
    }
}

/// A failed request: the stage that failed and the underlying cause.
#[derive(Debug, Error)]
#[error("{stage} → {source}")]
pub struct ProtocolError {
    pub stage: Stage,
    #[source]
    pub source: GatewayError,
}

impl ProtocolError {
    pub fn new(stage: Stage, source: impl Into<GatewayError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    /// I/O error kind used when handing the failure to the transport.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self.kind() {
            ErrorKind::NotFound | ErrorKind::ParentNotFound | ErrorKind::ChildNotFound => {
                io::ErrorKind::NotFound
            }
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::NotADirectory | ErrorKind::InvalidName | ErrorKind::Boundary => {
                io::ErrorKind::InvalidInput
            }
            ErrorKind::Unsupported => io::ErrorKind::Unsupported,
            ErrorKind::Timeout => io::ErrorKind::TimedOut,
            ErrorKind::RemoteListFailed
            | ErrorKind::RemoteUploadFailed
            | ErrorKind::RemoteDownloadFailed
            | ErrorKind::RemoteDeleteFailed => io::ErrorKind::Other,
        }
    }

    pub fn into_io(self) -> io::Error {
        io::Error::new(self.io_kind(), self.to_string())
    }
}

/// Process-level errors: configuration, logging setup, startup, transport.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
