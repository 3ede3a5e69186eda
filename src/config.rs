use anyhow::{Context, Result};
use colored::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "cfglift.toml";

#[derive(Debug, Deserialize, Default)]
pub struct CfgliftConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub substs: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RuntimeConfig {
    pub shell: Option<String>,
}

/// Loads `cfglift.toml` from `dir` (defaults when absent), then layers
/// `.env` or `.env.<CFGLIFT_ENV>` over its `[env]` table.
pub fn load_config(dir: &Path) -> Result<CfgliftConfig> {
    let config_path = dir.join(CONFIG_FILE);
    let mut config: CfgliftConfig = if config_path.exists() {
        let content = fs::read_to_string(&config_path).with_context(|| format!("Failed to read {}", CONFIG_FILE))?;
        parse_config(&content)?
    } else {
        log::debug!("No {} in {:?}, using defaults", CONFIG_FILE, dir);
        CfgliftConfig::default()
    };

    let env_filename = env::var("CFGLIFT_ENV")
        .map(|v| format!(".env.{}", v))
        .unwrap_or_else(|_| ".env".to_string());
    let env_path = dir.join(&env_filename);

    if env_path.exists() {
        eprintln!("{} Loading environment from: {}", "🌿".green(), env_filename.bold());
        // Read into the map only; the process environment stays untouched.
        for item in dotenvy::from_path_iter(&env_path).with_context(|| format!("Failed to read {}", env_filename))? {
            let (key, val) = item.with_context(|| format!("Invalid line in {}", env_filename))?;
            config.env.insert(key, val);
        }
    }

    Ok(config)
}

pub fn parse_config(content: &str) -> Result<CfgliftConfig> {
    toml::from_str(content).with_context(|| format!("Failed to parse {}", CONFIG_FILE))
}
