//! Environment variable source: SHARE9P_* prefix with __ separator

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

/// Add the environment overlay. `SHARE9P_SHARE` sets `share`,
/// `SHARE9P_STORE__ROOT` sets `store.root`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("SHARE9P")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
