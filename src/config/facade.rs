//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::GatewayConfig;
use config::ConfigError;
use std::path::{Path, PathBuf};

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Global config file location (`~/.config/share9p/config.toml` on Linux).
    pub fn global_config_path() -> Option<PathBuf> {
        super::sources::file::global_path()
    }

    /// Load from the global file (if present) and the environment.
    pub fn load() -> Result<GatewayConfig, ConfigError> {
        MergeService::load(None)
    }

    /// Load from `path` instead of the global file, with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
        MergeService::load(Some(path))
    }

    pub fn default() -> GatewayConfig {
        GatewayConfig::default()
    }
}
