//! TCP stream dialer
//!
//! Opens the control channel to the SOCKS5 server.

use super::{SocketOpts, StreamDialer};
use crate::config::ProxyConfig;
use crate::helper::{duration_from_secs, DEFAULT_CONNECT_TIMEOUT_SECS};
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP dialer for plain connections
#[derive(Debug, Clone)]
pub struct TcpStreamDialer {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout
    connect_timeout: Duration,
}

impl Default for TcpStreamDialer {
    fn default() -> Self {
        TcpStreamDialer {
            socket_opts: SocketOpts::default(),
            connect_timeout: duration_from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl TcpStreamDialer {
    /// Create a dialer from proxy configuration
    pub fn from_config(config: &ProxyConfig) -> Self {
        TcpStreamDialer {
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
            connect_timeout: duration_from_secs(config.connect_timeout),
        }
    }

    /// Set socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl StreamDialer for TcpStreamDialer {
    type Stream = TcpStream;

    async fn dial_stream(&self, addr: &str) -> io::Result<TcpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connection timeout to {}", addr),
                )
            })??;

        if let Err(e) = self.socket_opts.apply(&stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }

        tracing::debug!("TCP connection established to {}", addr);

        Ok(stream)
    }
}
