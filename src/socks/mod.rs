//! SOCKS5 client module
//!
//! This module implements the client side of SOCKS5 needed for UDP
//! ASSOCIATE: the control handshake, the relay datagram codec, and the
//! dialer that ties a control stream and a datagram socket together.

mod consts;
mod dialer;
mod handshake;
#[cfg(test)]
pub(crate) mod mock;
mod policy;
mod types;
mod udp;

pub use consts::*;
pub use dialer::Socks5Dialer;
pub use handshake::{
    authenticate_password, handshake, negotiate, read_reply, send_request, AuthMethod, Credentials,
};
pub use policy::{RelayAddrPolicy, SubstituteUnspecified, Verbatim};
pub use types::{SocksCommand, TargetAddr};
pub use udp::*;
