//! TOML file sources.

use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use std::path::{Path, PathBuf};

pub fn global_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "share9p", "share9p")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Global config file; skipped when absent.
pub fn add_global(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match global_path() {
        Some(path) => builder.add_source(
            File::from(path.as_path())
                .format(FileFormat::Toml)
                .required(false),
        ),
        None => builder,
    }
}

/// File named on the command line; must exist.
pub fn add_explicit(builder: ConfigBuilder<DefaultState>, path: &Path) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
}
