//! In-memory namespace mirroring the remote share.

pub mod namespace;
pub mod node;
pub mod path;

pub use namespace::Namespace;
pub use node::{Content, ContentGuard, Node, NodeInfo};
