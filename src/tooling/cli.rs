//! CLI Tooling
//!
//! Command-line interface for the gateway: serve a share over 9P, or inspect
//! the namespace it would expose.

use crate::config::{Backend, ConfigLoader, GatewayConfig};
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::logging::LoggingConfig;
use crate::tree::NodeInfo;
use crate::transport;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// share9p - serve a cloud file share over 9P
#[derive(Parser)]
#[command(name = "share9p")]
#[command(about = "Expose a remote file share through a 9P2000.L server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level unless --log-level is given)
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Prepare the share and serve it over 9P until interrupted
    Serve {
        /// Listen address, e.g. tcp!0.0.0.0!1337
        #[arg(long)]
        listen: Option<String>,
        /// Share name
        #[arg(long)]
        share: Option<String>,
        /// Directory holding the share (directory backend)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Store backend (directory, memory)
        #[arg(long)]
        backend: Option<Backend>,
    },
    /// Print the namespace below PATH, loading every directory
    Tree {
        #[arg(default_value = "/")]
        path: String,
    },
    /// List the entries of a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    /// Fold the logging flags into the configured logging settings.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        } else if self.verbose {
            config.level = "debug".to_string();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

/// CLI context holding the effective configuration.
pub struct CliContext {
    config: GatewayConfig,
}

impl CliContext {
    /// Load configuration from `config_path`, or the global file, plus the
    /// environment.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self { config })
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Configuration after applying a command's own overrides.
    pub fn effective_config(&self, command: &Commands) -> GatewayConfig {
        let mut config = self.config.clone();
        if let Commands::Serve {
            listen,
            share,
            root,
            backend,
        } = command
        {
            if let Some(listen) = listen {
                config.listen = listen.clone();
            }
            if let Some(share) = share {
                config.share = share.clone();
            }
            if let Some(root) = root {
                config.store.root = Some(root.clone());
            }
            if let Some(backend) = backend {
                config.store.backend = *backend;
            }
        }
        config
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let config = self.effective_config(command);
        config.validate()?;
        match command {
            Commands::Serve { .. } => self.handle_serve(config).await,
            Commands::Tree { path } => self.handle_tree(config, path).await,
            Commands::Ls { path, format } => self.handle_ls(config, path, format).await,
            Commands::Config => toml::to_string_pretty(&config)
                .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e))),
        }
    }

    async fn open_gateway(&self, config: &GatewayConfig) -> Result<Arc<Gateway>, ApiError> {
        let gateway = Gateway::from_config(config)?;
        gateway.bootstrap().await?;
        Ok(Arc::new(gateway))
    }

    async fn handle_serve(&self, config: GatewayConfig) -> Result<String, ApiError> {
        let gateway = self.open_gateway(&config).await?;
        tokio::select! {
            served = transport::serve(Arc::clone(&gateway), &config.listen) => served?,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Interrupted, shutting down");
            }
        }
        Ok(format!(
            "Stopped serving share {} ({} nodes cached)",
            config.share,
            gateway.namespace().total_count()
        ))
    }

    async fn handle_tree(&self, config: GatewayConfig, path: &str) -> Result<String, ApiError> {
        let gateway = self.open_gateway(&config).await?;
        let start = gateway.load_recursive(path).await?;
        let namespace = gateway.namespace();
        Ok(format!(
            "{}\n{} nodes",
            namespace.render_from(&start).trim_end(),
            namespace.total_count_from(&start)
        ))
    }

    async fn handle_ls(
        &self,
        config: GatewayConfig,
        path: &str,
        format: &str,
    ) -> Result<String, ApiError> {
        let gateway = self.open_gateway(&config).await?;
        let dir = gateway.walk(path).await?;
        let entries = gateway.children(&dir)?;
        match format {
            "json" => serde_json::to_string_pretty(&entries)
                .map_err(|e| ApiError::ConfigError(format!("Failed to render listing: {}", e))),
            "text" => Ok(format_listing(&entries)),
            other => Err(ApiError::ConfigError(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }
}

fn format_mode(info: &NodeInfo) -> String {
    let kind = if info.is_dir() { 'd' } else { '-' };
    format!("{}{:o}", kind, info.mode & 0o777)
}

/// Format directory entries as a table.
pub fn format_listing(entries: &[NodeInfo]) -> String {
    if entries.is_empty() {
        return "(empty)".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Kind", "Size", "Mode"]);
    for info in entries {
        table.add_row(vec![
            info.name.clone(),
            info.kind.to_string(),
            info.size.to_string(),
            format_mode(info),
        ]);
    }
    table.to_string()
}
