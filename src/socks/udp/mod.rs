//! UDP ASSOCIATE client support
//!
//! The relay header codec and the datagram connection built on it.

mod codec;
mod conn;

pub use codec::{
    copy_payload, decode_payload, encode_header, encode_packet, header_len, RelayDatagramHeader,
    UDP_HEADER_MIN_LEN,
};
pub use conn::Socks5UdpConn;
