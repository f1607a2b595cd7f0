//! In-memory control streams and datagram sockets for unit tests

use crate::helper::with_deadline;
use crate::transport::{ControlStream, PacketConn, PacketDialer, StreamDialer};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

/// Control stream backed by one half of a duplex pipe
#[derive(Debug)]
pub(crate) struct MockControl {
    inner: DuplexStream,
    peer: SocketAddr,
    shutdown_error: Option<io::ErrorKind>,
}

impl MockControl {
    /// Create a control stream reporting `peer` and the server half
    pub(crate) fn pair(peer: &str) -> (MockControl, DuplexStream) {
        let (client, server) = tokio::io::duplex(4096);
        let control = MockControl {
            inner: client,
            peer: peer.parse().unwrap(),
            shutdown_error: None,
        };
        (control, server)
    }

    /// Make `shutdown` fail with `kind`
    pub(crate) fn with_shutdown_error(mut self, kind: io::ErrorKind) -> Self {
        self.shutdown_error = Some(kind);
        self
    }
}

impl AsyncRead for MockControl {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockControl {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(kind) = this.shutdown_error {
            return Poll::Ready(Err(io::Error::new(kind, "mock shutdown failure")));
        }
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

impl ControlStream for MockControl {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.peer)
    }
}

/// Hands out a single prepared control stream
#[derive(Debug)]
pub(crate) struct MockStreamDialer {
    stream: Mutex<Option<MockControl>>,
    pub(crate) dialed: Mutex<Vec<String>>,
}

impl MockStreamDialer {
    pub(crate) fn new(stream: MockControl) -> Self {
        MockStreamDialer {
            stream: Mutex::new(Some(stream)),
            dialed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StreamDialer for MockStreamDialer {
    type Stream = MockControl;

    async fn dial_stream(&self, addr: &str) -> io::Result<MockControl> {
        self.dialed.lock().unwrap().push(addr.to_string());
        self.stream
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no mock stream left"))
    }
}

/// Datagram socket backed by channels
#[derive(Debug)]
pub(crate) struct MockPacketConn {
    inbound: tokio::sync::Mutex<UnboundedReceiver<Vec<u8>>>,
    outbound: UnboundedSender<Vec<u8>>,
    close_error: Option<io::ErrorKind>,
    read_deadline: Mutex<Option<Instant>>,
    write_deadline: Mutex<Option<Instant>>,
}

/// The relay side of a [`MockPacketConn`]
#[derive(Debug)]
pub(crate) struct MockPacketPeer {
    pub(crate) to_conn: UnboundedSender<Vec<u8>>,
    pub(crate) from_conn: UnboundedReceiver<Vec<u8>>,
}

/// Create a connected mock socket; `close_error` makes `close` fail
pub(crate) fn packet_pair(close_error: Option<io::ErrorKind>) -> (MockPacketConn, MockPacketPeer) {
    let (to_conn, inbound) = unbounded_channel();
    let (outbound, from_conn) = unbounded_channel();
    let conn = MockPacketConn {
        inbound: tokio::sync::Mutex::new(inbound),
        outbound,
        close_error,
        read_deadline: Mutex::new(None),
        write_deadline: Mutex::new(None),
    };
    (conn, MockPacketPeer { to_conn, from_conn })
}

#[async_trait]
impl PacketConn for MockPacketConn {
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = *self.read_deadline.lock().unwrap();
        with_deadline(deadline, async {
            let datagram = self
                .inbound
                .lock()
                .await
                .recv()
                .await
                .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionAborted, "peer gone"))?;
            let n = datagram.len().min(buf.len());
            buf[..n].copy_from_slice(&datagram[..n]);
            Ok(n)
        })
        .await
    }

    async fn send(&self, buf: &[u8]) -> io::Result<usize> {
        let deadline = *self.write_deadline.lock().unwrap();
        with_deadline(deadline, async {
            self.outbound
                .send(buf.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))?;
            Ok(buf.len())
        })
        .await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok("127.0.0.1:40000".parse().unwrap())
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) {
        *self.read_deadline.lock().unwrap() = deadline;
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) {
        *self.write_deadline.lock().unwrap() = deadline;
    }

    async fn close(self) -> io::Result<()> {
        match self.close_error {
            Some(kind) => Err(io::Error::new(kind, "mock close failure")),
            None => Ok(()),
        }
    }
}

/// Hands out a single prepared datagram socket, or fails every dial
#[derive(Debug)]
pub(crate) struct MockPacketDialer {
    conn: Mutex<Option<MockPacketConn>>,
    pub(crate) dialed: Mutex<Vec<String>>,
}

impl MockPacketDialer {
    pub(crate) fn new(conn: MockPacketConn) -> Self {
        MockPacketDialer {
            conn: Mutex::new(Some(conn)),
            dialed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        MockPacketDialer {
            conn: Mutex::new(None),
            dialed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PacketDialer for MockPacketDialer {
    type Conn = MockPacketConn;

    async fn dial_packet(&self, addr: &str) -> io::Result<MockPacketConn> {
        self.dialed.lock().unwrap().push(addr.to_string());
        self.conn
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "mock dial failure"))
    }
}
