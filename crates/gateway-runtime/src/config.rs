//! Configuration loading: optional JSON file, then environment overrides.

use anyhow::{Context, Result};
use api_gateway::GatewayConfig;
use std::path::Path;
use tracing::{info, warn};

/// Path of a JSON configuration file
pub const CONFIG_ENV: &str = "GATEWAY_CONFIG";
/// Public HTTP port override
pub const HTTP_PORT_ENV: &str = "GATEWAY_HTTP_PORT";
/// Admin port override
pub const ADMIN_PORT_ENV: &str = "GATEWAY_ADMIN_PORT";
/// Rate limiting on/off override
pub const RATE_LIMIT_ENV: &str = "GATEWAY_RATE_LIMIT_ENABLED";

/// Load configuration from the process environment.
pub fn load_config() -> Result<GatewayConfig> {
    load_config_with(|key| std::env::var(key).ok())
}

/// Load configuration using `env` to look up variables.
pub fn load_config_with(env: impl Fn(&str) -> Option<String>) -> Result<GatewayConfig> {
    let mut config = match env(CONFIG_ENV) {
        Some(path) => read_config_file(Path::new(&path))?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, &env);

    config
        .validate()
        .context("Invalid gateway configuration")?;
    Ok(config)
}

/// Parse a JSON configuration file. Missing sections take their defaults.
pub fn read_config_file(path: &Path) -> Result<GatewayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    info!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

fn apply_env_overrides(config: &mut GatewayConfig, env: &impl Fn(&str) -> Option<String>) {
    if let Some(port) = env(HTTP_PORT_ENV) {
        match port.parse() {
            Ok(p) => config.http.port = p,
            Err(_) => warn!(value = %port, "{HTTP_PORT_ENV} is not a port, ignored"),
        }
    }
    if let Some(port) = env(ADMIN_PORT_ENV) {
        match port.parse() {
            Ok(p) => config.admin.port = p,
            Err(_) => warn!(value = %port, "{ADMIN_PORT_ENV} is not a port, ignored"),
        }
    }
    if let Some(flag) = env(RATE_LIMIT_ENV) {
        match parse_flag(&flag) {
            Some(enabled) => config.rate_limit.enabled = enabled,
            None => warn!(value = %flag, "{RATE_LIMIT_ENV} is not a boolean, ignored"),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
