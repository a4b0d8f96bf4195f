mod commands;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use kbase_ops::init_tracing;
use kbase_types::config::KbaseConfig;

use crate::commands::{execute, Cli};

const DEFAULT_CONFIG_PATH: &str = "configs/dev.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = config_path(cli.config.clone());
    let config = load_config(&path);
    init_tracing(&config.ops)?;

    execute(cli.command, &config).await
}

fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn load_config(path: &Path) -> KbaseConfig {
    match KbaseConfig::from_file(path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            default_config()
        }
    }
}

fn default_config() -> KbaseConfig {
    let config = KbaseConfig::default();
    debug_assert!(config.validate().is_ok());
    config
}
