//! share9p: a 9P gateway to a remote file share
//!
//! Keeps an in-memory namespace mirroring the share, reconciles it with the
//! remote listing on demand, and serves it to 9P clients. Every mutation is
//! written through to the share with whole-object uploads.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod protocol;
pub mod store;
pub mod sync;
pub mod tooling;
pub mod transport;
pub mod tree;
pub mod types;

pub use error::{ApiError, GatewayError, ProtocolError};
pub use gateway::{Gateway, GatewayOptions};
