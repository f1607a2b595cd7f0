//! Proxy client configuration types
//!
//! Defines where the SOCKS5 server lives and how to authenticate to it.

use super::TcpConfig;
use crate::helper::DEFAULT_CONNECT_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};

/// Default connect timeout in seconds
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// SOCKS5 proxy configuration
    pub proxy: ProxyConfig,
}

/// SOCKS5 proxy configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProxyConfig {
    /// SOCKS5 server address (e.g., "proxy.example.com:1080")
    pub server_addr: String,

    /// Username for RFC 1929 authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for RFC 1929 authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Control channel connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// TCP options for the control channel
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl ProxyConfig {
    /// Create a configuration for an unauthenticated server
    pub fn new(server_addr: impl Into<String>) -> Self {
        ProxyConfig {
            server_addr: server_addr.into(),
            username: None,
            password: None,
            connect_timeout: default_connect_timeout(),
            tcp: TcpConfig::default(),
        }
    }

    /// Set username/password credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Check if authentication credentials are configured
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server_addr.is_empty() {
            return Err("server_addr must not be empty".to_string());
        }
        if self.username.is_some() != self.password.is_some() {
            return Err("username and password must be configured together".to_string());
        }
        for (name, value) in [("username", &self.username), ("password", &self.password)] {
            if let Some(value) = value {
                if value.is_empty() || value.len() > 255 {
                    return Err(format!("{} must be 1 to 255 bytes", name));
                }
            }
        }
        Ok(())
    }
}
