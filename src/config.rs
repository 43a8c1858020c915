//! Gateway configuration
//!
//! Layered with the `config` crate: serialized defaults, then the global or an
//! explicit TOML file, then `SHARE9P_*` environment variables (nested keys use
//! `__`, for example `SHARE9P_STORE__TIMEOUT_MS=5000`).

pub mod facade;
pub mod merge;
pub mod sources;

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use facade::ConfigLoader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// 9P listen address, `proto!host!port`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Name of the remote share.
    #[serde(default = "default_share")]
    pub share: String,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_listen() -> String {
    "tcp!0.0.0.0!1337".to_string()
}

fn default_share() -> String {
    "share9p".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            share: default_share(),
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Share directory under `store.root`, such as a mounted cloud share.
    Directory,
    /// In-process share, lost on exit.
    #[default]
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Directory => f.write_str("directory"),
            Backend::Memory => f.write_str("memory"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "directory" => Ok(Backend::Directory),
            "memory" => Ok(Backend::Memory),
            other => Err(ApiError::ConfigError(format!(
                "Unknown store backend: {} (must be 'directory' or 'memory')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Directory holding the share (directory backend).
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Deadline for every remote call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            root: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Download newly discovered files when a walk loads a directory.
    #[serde(default = "default_true")]
    pub prefetch_on_walk: bool,

    #[serde(default = "default_prefetch_concurrency")]
    pub prefetch_concurrency: usize,
}

fn default_true() -> bool {
    true
}

fn default_prefetch_concurrency() -> usize {
    4
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            prefetch_on_walk: default_true(),
            prefetch_concurrency: default_prefetch_concurrency(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.share.is_empty() {
            return Err(ApiError::ConfigError("Share name must not be empty".to_string()));
        }
        if self.share.contains('/') {
            return Err(ApiError::ConfigError(format!(
                "Share name must not contain '/': {}",
                self.share
            )));
        }
        if self.listen.is_empty() {
            return Err(ApiError::ConfigError("Listen address must not be empty".to_string()));
        }
        if self.store.timeout_ms == 0 {
            return Err(ApiError::ConfigError("store.timeout_ms must be positive".to_string()));
        }
        if self.sync.prefetch_concurrency == 0 {
            return Err(ApiError::ConfigError(
                "sync.prefetch_concurrency must be positive".to_string(),
            ));
        }
        if self.store.backend == Backend::Directory && self.store.root.is_none() {
            return Err(ApiError::ConfigError(
                "store.root is required for the directory backend".to_string(),
            ));
        }
        Ok(())
    }
}
