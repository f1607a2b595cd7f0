//! Test utilities and mocks for socks5-udp
//!
//! Provides a minimal in-process SOCKS5 server that answers UDP ASSOCIATE
//! and echoes relayed datagrams back to the client.

#![allow(dead_code)]

use socks5_udp::socks::*;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::oneshot;

/// Payload that makes the relay answer with a fragmented datagram first
pub const BAD_DATAGRAM_TRIGGER: &[u8] = b"send-bad-first";

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Mock server behaviour
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Require username/password authentication
    pub credentials: Option<(String, String)>,
    /// Report `0.0.0.0` instead of the relay's real host
    pub wildcard_bind: bool,
}

/// Handle to a spawned mock server
pub struct MockSocks5Server {
    /// Control channel address
    pub addr: SocketAddr,
    /// Fires once the client closes the control channel
    pub control_closed: oneshot::Receiver<()>,
    /// Receives the relay's real address once the association is set up
    pub relay_addr: oneshot::Receiver<SocketAddr>,
}

/// Spawn a mock server accepting a single client
pub async fn spawn_socks5_server(options: ServerOptions) -> MockSocks5Server {
    let (listener, addr) = create_test_listener().await;
    let (closed_tx, closed_rx) = oneshot::channel();
    let (relay_tx, relay_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream, options, closed_tx, relay_tx).await;
    });

    MockSocks5Server {
        addr,
        control_closed: closed_rx,
        relay_addr: relay_rx,
    }
}

async fn serve(
    mut stream: TcpStream,
    options: ServerOptions,
    closed_tx: oneshot::Sender<()>,
    relay_tx: oneshot::Sender<SocketAddr>,
) {
    // Method negotiation
    let version = stream.read_u8().await.unwrap();
    assert_eq!(version, SOCKS5_VERSION);
    let n = stream.read_u8().await.unwrap() as usize;
    let mut methods = vec![0u8; n];
    stream.read_exact(&mut methods).await.unwrap();

    match &options.credentials {
        Some((username, password)) => {
            assert!(methods.contains(&SOCKS5_AUTH_METHOD_PASSWORD));
            stream
                .write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_PASSWORD])
                .await
                .unwrap();

            assert_eq!(stream.read_u8().await.unwrap(), SOCKS5_AUTH_VERSION);
            let ulen = stream.read_u8().await.unwrap() as usize;
            let mut user = vec![0u8; ulen];
            stream.read_exact(&mut user).await.unwrap();
            let plen = stream.read_u8().await.unwrap() as usize;
            let mut pass = vec![0u8; plen];
            stream.read_exact(&mut pass).await.unwrap();

            if user != username.as_bytes() || pass != password.as_bytes() {
                stream.write_all(&[SOCKS5_AUTH_VERSION, 0x01]).await.unwrap();
                return;
            }
            stream
                .write_all(&[SOCKS5_AUTH_VERSION, SOCKS5_AUTH_STATUS_SUCCESS])
                .await
                .unwrap();
        }
        None => {
            stream
                .write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
                .await
                .unwrap();
        }
    }

    // UDP ASSOCIATE request
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[1], SOCKS5_CMD_UDP_ASSOCIATE);
    let requested = TargetAddr::read_from(&mut stream, header[3]).await.unwrap();
    assert_eq!(requested.to_string(), "0.0.0.0:0");

    let relay = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let relay_addr = relay.local_addr().unwrap();
    let reported_ip = if options.wildcard_bind {
        [0, 0, 0, 0]
    } else {
        [127, 0, 0, 1]
    };

    let mut reply = vec![
        SOCKS5_VERSION,
        SOCKS5_REPLY_SUCCEEDED,
        SOCKS5_RESERVED,
        SOCKS5_ADDR_TYPE_IPV4,
    ];
    reply.extend_from_slice(&reported_ip);
    reply.extend_from_slice(&relay_addr.port().to_be_bytes());
    stream.write_all(&reply).await.unwrap();
    let _ = relay_tx.send(relay_addr);

    let relay_task = tokio::spawn(echo_relay(relay));

    // The association lives until the control channel closes
    let mut buf = [0u8; 64];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
    relay_task.abort();
    let _ = closed_tx.send(());
}

/// Echo each datagram back unchanged, header included
async fn echo_relay(relay: UdpSocket) {
    let mut buf = vec![0u8; 65536];
    loop {
        let (n, from) = match relay.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(_) => return,
        };
        let datagram = &buf[..n];

        if decode_payload(datagram).ok() == Some(BAD_DATAGRAM_TRIGGER) {
            let mut fragmented = datagram.to_vec();
            fragmented[2] = 1;
            relay.send_to(&fragmented, from).await.unwrap();
        }
        relay.send_to(datagram, from).await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_listener() {
        let (listener, addr) = create_test_listener().await;
        assert!(addr.port() > 0);
        drop(listener);
    }
}
