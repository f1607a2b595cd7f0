//! SOCKS5 type definitions
//!
//! Defines the command and address types shared by the handshake and the
//! UDP header codec.

use super::consts::*;
use crate::error::{HandshakeError, Socks5UdpError};
use bytes::BufMut;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection
    Bind,
    /// UDP ASSOCIATE - establish UDP relay
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS5_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }

    /// Convert SocksCommand to byte
    pub fn to_byte(self) -> u8 {
        match self {
            SocksCommand::Connect => SOCKS5_CMD_TCP_CONNECT,
            SocksCommand::Bind => SOCKS5_CMD_TCP_BIND,
            SocksCommand::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// Target address for SOCKS5 requests
///
/// Represents a destination as it travels on the wire: an IP address
/// (v4 or v6) or a domain name, always with a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: impl Into<String>, port: u16) -> Self {
        TargetAddr::Domain(domain.into(), port)
    }

    /// Parse `host:port` text
    ///
    /// IPv6 literals must be bracketed (`[::1]:53`). Anything that is not
    /// an IP literal is kept as a domain name.
    pub fn parse(addr: &str) -> Result<Self, Socks5UdpError> {
        if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
            return Ok(TargetAddr::Ip(socket_addr));
        }

        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| Socks5UdpError::address_parse(addr, "missing port"))?;
        let port: u16 = port
            .parse()
            .map_err(|_| Socks5UdpError::address_parse(addr, format!("invalid port {:?}", port)))?;

        if host.is_empty() {
            return Err(Socks5UdpError::address_parse(addr, "missing host"));
        }
        if host.starts_with('[') || host.contains(':') {
            return Err(Socks5UdpError::address_parse(addr, "malformed IPv6 host"));
        }

        Ok(TargetAddr::Domain(host.to_string(), port))
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Get the host part, IPv6 literals without brackets
    pub fn host(&self) -> String {
        match self {
            TargetAddr::Ip(addr) => addr.ip().to_string(),
            TargetAddr::Domain(domain, _) => domain.clone(),
        }
    }

    /// Get the address type byte for SOCKS5 protocol
    pub fn addr_type(&self) -> u8 {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => SOCKS5_ADDR_TYPE_IPV4,
            TargetAddr::Ip(SocketAddr::V6(_)) => SOCKS5_ADDR_TYPE_IPV6,
            TargetAddr::Domain(_, _) => SOCKS5_ADDR_TYPE_DOMAIN,
        }
    }

    /// Number of bytes `append_to` writes
    pub fn serialized_len(&self) -> usize {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => 1 + 4 + 2,
            TargetAddr::Ip(SocketAddr::V6(_)) => 1 + 16 + 2,
            TargetAddr::Domain(domain, _) => 1 + 1 + domain.len() + 2,
        }
    }

    /// Append `ATYP | ADDR | PORT` to `buf`
    ///
    /// Domain names must be 1 to 255 bytes long.
    pub fn append_to<B: BufMut>(&self, buf: &mut B) -> Result<(), Socks5UdpError> {
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                buf.put_u8(SOCKS5_ADDR_TYPE_IPV4);
                buf.put_slice(&addr.ip().octets());
                buf.put_u16(addr.port());
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                buf.put_u8(SOCKS5_ADDR_TYPE_IPV6);
                buf.put_slice(&addr.ip().octets());
                buf.put_u16(addr.port());
            }
            TargetAddr::Domain(domain, port) => {
                if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
                    return Err(Socks5UdpError::AddressFormat(format!(
                        "domain name length {} outside 1..={}",
                        domain.len(),
                        MAX_DOMAIN_LEN
                    )));
                }
                buf.put_u8(SOCKS5_ADDR_TYPE_DOMAIN);
                buf.put_u8(domain.len() as u8);
                buf.put_slice(domain.as_bytes());
                buf.put_u16(*port);
            }
        }

        Ok(())
    }

    /// Serialize the address to bytes for SOCKS5 protocol
    pub fn to_bytes(&self) -> Result<Vec<u8>, Socks5UdpError> {
        let mut bytes = Vec::with_capacity(self.serialized_len());
        self.append_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Read `ADDR | PORT` for the given address type from a stream
    pub async fn read_from<S>(stream: &mut S, addr_type: u8) -> Result<Self, HandshakeError>
    where
        S: AsyncRead + Unpin,
    {
        match addr_type {
            SOCKS5_ADDR_TYPE_IPV4 => {
                let mut addr = [0u8; 4];
                stream.read_exact(&mut addr).await?;
                let port = stream.read_u16().await?;

                Ok(TargetAddr::ipv4(Ipv4Addr::from(addr), port))
            }

            SOCKS5_ADDR_TYPE_DOMAIN => {
                let domain_len = stream.read_u8().await? as usize;
                if domain_len == 0 {
                    return Err(HandshakeError::InvalidDomain("empty domain name".to_string()));
                }

                let mut domain_buf = vec![0u8; domain_len];
                stream.read_exact(&mut domain_buf).await?;
                let domain = String::from_utf8(domain_buf)
                    .map_err(|e| HandshakeError::InvalidDomain(e.to_string()))?;
                let port = stream.read_u16().await?;

                Ok(TargetAddr::Domain(domain, port))
            }

            SOCKS5_ADDR_TYPE_IPV6 => {
                let mut addr = [0u8; 16];
                stream.read_exact(&mut addr).await?;
                let port = stream.read_u16().await?;

                Ok(TargetAddr::ipv6(Ipv6Addr::from(addr), port))
            }

            _ => Err(HandshakeError::AddressTypeNotSupported(addr_type)),
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

impl std::str::FromStr for TargetAddr {
    type Err = Socks5UdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetAddr::parse(s)
    }
}
