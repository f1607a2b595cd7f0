//! SOCKS5 UDP association manager
//!
//! [`Socks5Dialer::dial_packet`] opens a proxied datagram connection in four
//! strictly sequential steps:
//!
//! 1. Parse the destination address.
//! 2. Dial the control stream and run UDP ASSOCIATE, requesting `0.0.0.0:0`.
//! 3. Resolve the reported bind address through the [`RelayAddrPolicy`].
//! 4. Dial the datagram socket to the resolved relay endpoint.
//!
//! Nothing is retried here. Dropping the returned future cancels the open
//! at its next await point.

use super::handshake::{handshake, Credentials};
use super::policy::{RelayAddrPolicy, SubstituteUnspecified};
use super::types::{SocksCommand, TargetAddr};
use super::udp::Socks5UdpConn;
use crate::config::ProxyConfig;
use crate::error::{HandshakeError, Socks5UdpError};
use crate::transport::{ControlStream, PacketDialer, StreamDialer, TcpStreamDialer, UdpPacketDialer};
use std::net::Ipv4Addr;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Client for a single SOCKS5 server
#[derive(Debug, Clone)]
pub struct Socks5Dialer<SD = TcpStreamDialer, PD = UdpPacketDialer, R = SubstituteUnspecified> {
    /// SOCKS5 server address as `host:port`
    proxy_addr: String,
    /// Optional RFC 1929 credentials
    credentials: Option<Credentials>,
    stream_dialer: SD,
    packet_dialer: PD,
    relay_policy: R,
}

impl Socks5Dialer {
    /// Create a TCP/UDP dialer from proxy configuration
    pub fn from_config(config: &ProxyConfig) -> Result<Self, Socks5UdpError> {
        config.validate().map_err(Socks5UdpError::Config)?;

        let mut dialer = Socks5Dialer::new(
            config.server_addr.clone(),
            TcpStreamDialer::from_config(config),
            UdpPacketDialer,
        );
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            dialer = dialer.with_credentials(Credentials::new(username, password));
        }

        Ok(dialer)
    }
}

impl<SD: StreamDialer, PD: PacketDialer> Socks5Dialer<SD, PD> {
    /// Create a dialer for the server at `proxy_addr`
    pub fn new(proxy_addr: impl Into<String>, stream_dialer: SD, packet_dialer: PD) -> Self {
        Socks5Dialer {
            proxy_addr: proxy_addr.into(),
            credentials: None,
            stream_dialer,
            packet_dialer,
            relay_policy: SubstituteUnspecified,
        }
    }
}

impl<SD, PD, R> Socks5Dialer<SD, PD, R>
where
    SD: StreamDialer,
    PD: PacketDialer,
    R: RelayAddrPolicy,
{
    /// Authenticate with username/password
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Replace the relay address policy
    pub fn with_relay_policy<R2: RelayAddrPolicy>(self, relay_policy: R2) -> Socks5Dialer<SD, PD, R2> {
        Socks5Dialer {
            proxy_addr: self.proxy_addr,
            credentials: self.credentials,
            stream_dialer: self.stream_dialer,
            packet_dialer: self.packet_dialer,
            relay_policy,
        }
    }

    /// SOCKS5 server address
    pub fn proxy_addr(&self) -> &str {
        &self.proxy_addr
    }

    /// Open a control stream and issue `command` for `addr`
    ///
    /// Returns the live stream and the bind address the server reported.
    pub async fn request(
        &self,
        command: SocksCommand,
        addr: &TargetAddr,
    ) -> Result<(SD::Stream, TargetAddr), HandshakeError> {
        let mut stream = self
            .stream_dialer
            .dial_stream(&self.proxy_addr)
            .await
            .map_err(|source| HandshakeError::Connect {
                addr: self.proxy_addr.clone(),
                source,
            })?;

        let bound = handshake(&mut stream, self.credentials.as_ref(), command, addr).await?;
        Ok((stream, bound))
    }

    /// Open a datagram connection to `dst_addr` through the proxy
    pub async fn dial_packet(
        &self,
        dst_addr: &str,
    ) -> Result<Socks5UdpConn<SD::Stream, PD::Conn>, Socks5UdpError> {
        let dst = TargetAddr::parse(dst_addr)?;

        let wildcard = TargetAddr::ipv4(Ipv4Addr::UNSPECIFIED, 0);
        let (mut control, bind_addr) = self.request(SocksCommand::UdpAssociate, &wildcard).await?;
        debug!("UDP ASSOCIATE via {} bound at {}", self.proxy_addr, bind_addr);

        let control_peer = match control.peer_addr() {
            Ok(addr) => addr,
            Err(e) => {
                close_control(&mut control).await;
                return Err(Socks5UdpError::Io(e));
            }
        };
        let relay_addr = self.relay_policy.resolve(&bind_addr, control_peer);
        if relay_addr != bind_addr {
            debug!(
                "Relay bind address {} resolved to {} via control peer",
                bind_addr, relay_addr
            );
        }

        let relay = relay_addr.to_string();
        let packet = match self.packet_dialer.dial_packet(&relay).await {
            Ok(packet) => packet,
            Err(source) => {
                close_control(&mut control).await;
                return Err(Socks5UdpError::DatagramDial {
                    addr: relay,
                    source,
                });
            }
        };

        debug!("UDP association to {} ready via relay {}", dst, relay_addr);
        Ok(Socks5UdpConn::new(dst, relay_addr, control, packet))
    }
}

/// Best-effort shutdown after a partial setup failure
async fn close_control<S: ControlStream>(control: &mut S) {
    if let Err(e) = control.shutdown().await {
        warn!("Failed to close control channel: {}", e);
    }
}
