//! UDP packet dialer
//!
//! Opens the datagram channel to the relay endpoint the SOCKS5 server
//! allocated, with per-direction deadlines.

use super::{PacketConn, PacketDialer};
use crate::helper::with_deadline;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Mutex;
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// Dialer producing connected UDP sockets
#[derive(Debug, Clone, Default)]
pub struct UdpPacketDialer;

#[async_trait]
impl PacketDialer for UdpPacketDialer {
    type Conn = UdpPacketConn;

    async fn dial_packet(&self, addr: &str) -> io::Result<UdpPacketConn> {
        let remote = tokio::net::lookup_host(addr).await?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no addresses found for {}", addr),
            )
        })?;

        let bind_ip = match remote {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let socket = UdpSocket::bind(SocketAddr::new(bind_ip, 0)).await?;
        socket.connect(remote).await?;

        tracing::debug!(
            "UDP socket {} connected to {}",
            socket.local_addr()?,
            remote
        );

        Ok(UdpPacketConn::new(socket))
    }
}

/// Connected UDP socket with read/write deadlines
#[derive(Debug)]
pub struct UdpPacketConn {
    socket: UdpSocket,
    read_deadline: Mutex<Option<Instant>>,
    write_deadline: Mutex<Option<Instant>>,
}

impl UdpPacketConn {
    /// Wrap an already connected socket
    pub fn new(socket: UdpSocket) -> Self {
        UdpPacketConn {
            socket,
            read_deadline: Mutex::new(None),
            write_deadline: Mutex::new(None),
        }
    }

    /// Address the socket is connected to
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }

    fn load(slot: &Mutex<Option<Instant>>) -> Option<Instant> {
        *slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(slot: &Mutex<Option<Instant>>, deadline: Option<Instant>) {
        *slot.lock().unwrap_or_else(|e| e.into_inner()) = deadline;
    }
}

#[async_trait]
impl PacketConn for UdpPacketConn {
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = Self::load(&self.read_deadline);
        with_deadline(deadline, self.socket.recv(buf)).await
    }

    async fn send(&self, buf: &[u8]) -> io::Result<usize> {
        let deadline = Self::load(&self.write_deadline);
        with_deadline(deadline, self.socket.send(buf)).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) {
        Self::store(&self.read_deadline, deadline);
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) {
        Self::store(&self.write_deadline, deadline);
    }

    async fn close(self) -> io::Result<()> {
        drop(self.socket);
        Ok(())
    }
}
