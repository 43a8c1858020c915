//! Tooling & Integration Layer
//!
//! Command-line entry points for serving and inspecting a share.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
