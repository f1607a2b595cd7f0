//! Transport module for socks5-udp
//!
//! This module provides the dialer abstractions the association manager
//! builds on: a stream dialer for the SOCKS5 control channel and a packet
//! dialer for the datagram channel to the relay.

mod tcp;
mod udp;

pub use tcp::TcpStreamDialer;
pub use udp::{UdpPacketConn, UdpPacketDialer};

use crate::config::TcpConfig;
use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Socket options for configuring connections
#[derive(Debug, Clone)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive timeout
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive_secs: Some(20),
            keepalive_interval: Some(8),
        }
    }
}

impl SocketOpts {
    /// Create socket options from TCP config
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        SocketOpts {
            nodelay: config.nodelay,
            keepalive_secs: Some(config.keepalive_secs),
            keepalive_interval: Some(config.keepalive_interval),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

/// A stream usable as the SOCKS5 control channel
///
/// Besides carrying the handshake, the stream must report its remote
/// endpoint so an unspecified relay bind host can be substituted.
pub trait ControlStream: AsyncRead + AsyncWrite + Unpin + Send + Sync + Debug + 'static {
    /// Remote endpoint of the control connection
    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

impl ControlStream for TcpStream {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }
}

/// Dialer for stream-oriented connections
#[async_trait]
pub trait StreamDialer: Debug + Send + Sync + 'static {
    /// The stream type produced by this dialer
    type Stream: ControlStream;

    /// Connect to `addr` given as `host:port`
    async fn dial_stream(&self, addr: &str) -> io::Result<Self::Stream>;
}

/// A connected datagram socket
///
/// `recv` and `send` take `&self`, so one reader and one writer may run
/// concurrently. Deadlines apply to subsequent calls; `None` clears them.
#[async_trait]
pub trait PacketConn: Debug + Send + Sync + 'static {
    /// Receive one datagram into `buf`
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Send `buf` as one datagram
    async fn send(&self, buf: &[u8]) -> io::Result<usize>;

    /// Local endpoint of the socket
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Deadline for future `recv` calls
    fn set_read_deadline(&self, deadline: Option<Instant>);

    /// Deadline for future `send` calls
    fn set_write_deadline(&self, deadline: Option<Instant>);

    /// Deadline for both directions
    fn set_deadline(&self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    /// Release the socket
    async fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// Dialer for datagram-oriented connections
#[async_trait]
pub trait PacketDialer: Debug + Send + Sync + 'static {
    /// The connection type produced by this dialer
    type Conn: PacketConn;

    /// Open a datagram socket connected to `addr` given as `host:port`
    async fn dial_packet(&self, addr: &str) -> io::Result<Self::Conn>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_opts_default() {
        let opts = SocketOpts::default();
        assert!(opts.nodelay);
        assert_eq!(opts.keepalive_secs, Some(20));
        assert_eq!(opts.keepalive_interval, Some(8));
    }

    #[test]
    fn test_socket_opts_from_tcp_config() {
        let config = TcpConfig {
            nodelay: false,
            keepalive_secs: 60,
            keepalive_interval: 15,
        };
        let opts = SocketOpts::from_tcp_config(&config);
        assert!(!opts.nodelay);
        assert_eq!(opts.keepalive_secs, Some(60));
        assert_eq!(opts.keepalive_interval, Some(15));
    }
}
