//! Cache-to-remote reconciliation.

pub mod diff;
pub mod engine;

pub use diff::{intersect, missing_locally, missing_remotely};
pub use engine::{Prefetch, SyncEngine, SyncReport};
