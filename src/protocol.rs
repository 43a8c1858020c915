//! Request dispatch for client sessions.
//!
//! A [`Session`] turns path-addressed [`Request`]s into gateway calls and tags
//! every failure with the stage that produced it.

pub mod cursor;
pub mod request;
pub mod session;

pub use cursor::DirCursor;
pub use request::{Request, Response};
pub use session::Session;
