//! Helper utilities for socks5-udp
//!
//! Shared constants and the deadline plumbing used by the datagram socket.

use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::time::Instant;

/// Maximum size of a UDP payload, used for the per-read staging buffer
pub const MAX_UDP_PACKET_SIZE: usize = 65536;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Parse duration from seconds
pub fn duration_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// Run `fut` until `deadline`, if one is set
///
/// A deadline that has already passed fails immediately with
/// [`io::ErrorKind::TimedOut`] without polling the future.
pub async fn with_deadline<F, T>(deadline: Option<Instant>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match deadline {
        None => fut.await,
        Some(deadline) => {
            if deadline <= Instant::now() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "i/o deadline exceeded"));
            }
            tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "i/o deadline exceeded"))?
        }
    }
}
