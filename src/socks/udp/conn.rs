//! Proxied datagram connection
//!
//! A [`Socks5UdpConn`] owns both halves of a UDP association: the control
//! stream that keeps the association alive on the server, and the datagram
//! socket connected to the relay. Every datagram written is prefixed with
//! the relay header for the fixed destination, and every datagram read has
//! its header validated and stripped.

use super::codec;
use crate::error::{CloseError, Socks5UdpError};
use crate::helper::MAX_UDP_PACKET_SIZE;
use crate::socks::types::TargetAddr;
use crate::transport::{ControlStream, PacketConn};
use std::io;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

/// Datagram connection relayed through a SOCKS5 server
///
/// Created by [`Socks5Dialer::dial_packet`](crate::socks::Socks5Dialer::dial_packet).
/// `read` and `write` take `&self`, so a reader and a writer can share the
/// connection; concurrent reads (or concurrent writes) are not ordered with
/// respect to each other. [`close`](Self::close) consumes the connection and
/// is the only way either handle gets torn down.
#[derive(Debug)]
pub struct Socks5UdpConn<S, P> {
    /// Destination baked into every outgoing header
    dst_addr: TargetAddr,
    /// Relay endpoint the datagram socket is connected to
    relay_addr: TargetAddr,
    /// Datagram channel to the relay
    packet: P,
    // Never read after the handshake, held open for the association's lifetime
    control: S,
}

impl<S: ControlStream, P: PacketConn> Socks5UdpConn<S, P> {
    pub(crate) fn new(dst_addr: TargetAddr, relay_addr: TargetAddr, control: S, packet: P) -> Self {
        Socks5UdpConn {
            dst_addr,
            relay_addr,
            packet,
            control,
        }
    }

    /// Read one datagram and copy its payload into `buf`
    ///
    /// Exactly one datagram is consumed per call. A payload larger than
    /// `buf` is truncated to fit. A malformed datagram yields a
    /// [`Socks5UdpError::Decode`] and leaves the connection usable.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, Socks5UdpError> {
        let mut staging = vec![0u8; MAX_UDP_PACKET_SIZE];
        let n = self.packet.recv(&mut staging).await?;

        let copied = codec::copy_payload(&staging[..n], buf)?;
        tracing::trace!("received {} byte datagram, {} payload bytes", n, copied);

        Ok(copied)
    }

    /// Send `buf` as one datagram to the destination
    ///
    /// Returns the number of payload bytes sent, header excluded.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, Socks5UdpError> {
        let packet = codec::encode_packet(&self.dst_addr, buf)?;
        let header_len = packet.len() - buf.len();

        let sent = self.packet.send(&packet).await?;
        tracing::trace!("sent {} byte datagram to {}", sent, self.dst_addr);

        Ok(sent.saturating_sub(header_len))
    }

    /// Close the datagram socket and the control stream
    ///
    /// Both are always attempted; failures from either side are collected
    /// into the returned [`CloseError`].
    pub async fn close(self) -> Result<(), CloseError> {
        let Socks5UdpConn {
            dst_addr,
            packet,
            mut control,
            ..
        } = self;
        let mut errors = CloseError::default();

        if let Err(e) = packet.close().await {
            tracing::debug!("Failed to close datagram socket for {}: {}", dst_addr, e);
            errors.datagram = Some(e);
        }
        if let Err(e) = control.shutdown().await {
            tracing::debug!("Failed to close control channel for {}: {}", dst_addr, e);
            errors.control = Some(e);
        }
        drop(control);

        tracing::debug!("UDP association to {} closed", dst_addr);
        errors.into_result()
    }

    /// Local endpoint of the datagram socket
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.packet.local_addr()
    }

    /// The destination given at open time
    pub fn remote_addr(&self) -> &TargetAddr {
        &self.dst_addr
    }

    /// The relay endpoint datagrams actually travel to
    pub fn relay_addr(&self) -> &TargetAddr {
        &self.relay_addr
    }

    /// Set read and write deadlines on the datagram socket
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        self.packet.set_deadline(deadline);
    }

    /// Set the read deadline on the datagram socket
    pub fn set_read_deadline(&self, deadline: Option<Instant>) {
        self.packet.set_read_deadline(deadline);
    }

    /// Set the write deadline on the datagram socket
    pub fn set_write_deadline(&self, deadline: Option<Instant>) {
        self.packet.set_write_deadline(deadline);
    }
}
