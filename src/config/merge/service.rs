//! MergeService: orchestrates sources and deserializes to GatewayConfig.

use crate::config::merge::builder_with_defaults;
use crate::config::sources::{environment, file};
use crate::config::GatewayConfig;
use config::ConfigError;
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> explicit file, or the global file when
    /// none is given -> environment (highest).
    pub fn load(explicit: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = match explicit {
            Some(path) => file::add_explicit(builder, path),
            None => file::add_global(builder),
        };
        let builder = environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }
}
