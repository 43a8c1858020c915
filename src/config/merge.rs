//! Merge policy: serialized defaults form the lowest layer.

pub mod service;

use crate::config::GatewayConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with [`GatewayConfig::default`].
pub(crate) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&GatewayConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
