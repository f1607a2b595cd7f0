//! Configuration module for socks5-udp
//!
//! This module provides configuration types and parsing for the proxy client.

mod client;
mod transport;

pub use client::{Config, ProxyConfig};
pub use transport::TcpConfig;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .proxy
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid proxy configuration: {}", e))?;
    Ok(config)
}
