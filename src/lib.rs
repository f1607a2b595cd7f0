//! # socks5-udp - SOCKS5 UDP ASSOCIATE client
//!
//! socks5-udp opens datagram connections relayed through a SOCKS5 server.
//! It runs the UDP ASSOCIATE handshake on a control stream, dials the relay
//! endpoint the server allocated, and frames every datagram with the SOCKS5
//! UDP request header.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socks5_udp::config::ProxyConfig;
//! use socks5_udp::socks::Socks5Dialer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dialer = Socks5Dialer::from_config(&ProxyConfig::new("127.0.0.1:1080"))?;
//!     let conn = dialer.dial_packet("8.8.8.8:53").await?;
//!
//!     conn.write(b"...").await?;
//!     let mut buf = [0u8; 1500];
//!     let n = conn.read(&mut buf).await?;
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The control stream stays open for the lifetime of the association; the
//! server tears the relay down when it closes. No payload flows over it
//! after the handshake.
//!
//! ```text
//! Application -> Socks5UdpConn -> UDP relay (SOCKS5 server) -> Destination
//!                      \
//!                       control stream (TCP, keeps the relay alive)
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod helper;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config, ProxyConfig};
pub use error::{CloseError, DecodeError, HandshakeError, Socks5UdpError};
pub use socks::{Socks5Dialer, Socks5UdpConn, TargetAddr};

/// Version of the socks5-udp library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
