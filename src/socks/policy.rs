//! Relay address resolution
//!
//! The UDP ASSOCIATE reply names the relay endpoint. Servers behind NAT or
//! listening on a wildcard often report an unspecified host, meaning "the
//! address you reached me on". The policy decides which endpoint the
//! datagram socket actually dials.

use crate::socks::types::TargetAddr;
use std::fmt::Debug;
use std::net::SocketAddr;

/// Maps the server-reported bind address to the endpoint to dial
pub trait RelayAddrPolicy: Debug + Send + Sync + 'static {
    /// Resolve `bind` given the control channel's remote endpoint
    fn resolve(&self, bind: &TargetAddr, control_peer: SocketAddr) -> TargetAddr;
}

/// Replace an unspecified bind host (`0.0.0.0`, `::`) with the control
/// channel's remote host, keeping the reported port
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstituteUnspecified;

impl RelayAddrPolicy for SubstituteUnspecified {
    fn resolve(&self, bind: &TargetAddr, control_peer: SocketAddr) -> TargetAddr {
        match bind {
            TargetAddr::Ip(addr) if addr.ip().is_unspecified() => {
                TargetAddr::Ip(SocketAddr::new(control_peer.ip(), addr.port()))
            }
            other => other.clone(),
        }
    }
}

/// Use the bind address exactly as reported
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl RelayAddrPolicy for Verbatim {
    fn resolve(&self, bind: &TargetAddr, _control_peer: SocketAddr) -> TargetAddr {
        bind.clone()
    }
}
