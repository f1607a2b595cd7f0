//! UDP relay datagram encoding/decoding for SOCKS5
//!
//! Every datagram exchanged with the relay carries this header in front of
//! the application payload:
//!
//! ```text
//! +----+------+------+----------+----------+----------+
//! |RSV | FRAG | ATYP | DST.ADDR | DST.PORT |   DATA   |
//! +----+------+------+----------+----------+----------+
//! | 2  |  1   |  1   | Variable |    2     | Variable |
//! +----+------+------+----------+----------+----------+
//! ```
//!
//! Fragmented datagrams (FRAG != 0) are rejected, never reassembled.

use crate::error::{DecodeError, Socks5UdpError};
use crate::socks::consts::*;
use crate::socks::types::TargetAddr;
use bytes::{BufMut, BytesMut};

/// Smallest possible header: RSV + FRAG + ATYP + IPv4 + PORT
pub const UDP_HEADER_MIN_LEN: usize = 10;

/// RSV (2) + FRAG (1) + ATYP (1)
const UDP_HEADER_FIXED_LEN: usize = 4;

/// Outgoing relay header for one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayDatagramHeader {
    /// Destination the relay forwards the payload to
    pub destination: TargetAddr,
}

impl RelayDatagramHeader {
    /// Create a header for `destination`
    pub fn new(destination: TargetAddr) -> Self {
        RelayDatagramHeader { destination }
    }

    /// Encoded header length in bytes
    pub fn encoded_len(&self) -> usize {
        3 + self.destination.serialized_len()
    }

    /// Append the encoded header to `buf`
    pub fn write_to<B: BufMut>(&self, buf: &mut B) -> Result<(), Socks5UdpError> {
        // RSV (2 bytes) + FRAG (1 byte), no fragmentation
        buf.put_u16(0);
        buf.put_u8(0);
        self.destination.append_to(buf)
    }
}

/// Encode the relay header for `destination`
pub fn encode_header(destination: &TargetAddr) -> Result<BytesMut, Socks5UdpError> {
    encode_packet(destination, &[])
}

/// Encode header and payload into one datagram
pub fn encode_packet(destination: &TargetAddr, payload: &[u8]) -> Result<BytesMut, Socks5UdpError> {
    let header = RelayDatagramHeader::new(destination.clone());
    let mut buf = BytesMut::with_capacity(header.encoded_len() + payload.len());
    header.write_to(&mut buf)?;
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Validate the header of a received datagram and return its length
pub fn header_len(datagram: &[u8]) -> Result<usize, DecodeError> {
    let n = datagram.len();
    if n < UDP_HEADER_MIN_LEN {
        return Err(DecodeError::TooShort(n));
    }

    let rsv = u16::from_be_bytes([datagram[0], datagram[1]]);
    if rsv != 0 {
        return Err(DecodeError::InvalidReserved(rsv));
    }

    let frag = datagram[2];
    if frag != 0 {
        return Err(DecodeError::FragmentationUnsupported(frag));
    }

    let addr_len = match datagram[3] {
        SOCKS5_ADDR_TYPE_IPV4 => 4,
        SOCKS5_ADDR_TYPE_IPV6 => 16,
        // Length byte plus the name itself
        SOCKS5_ADDR_TYPE_DOMAIN => datagram[4] as usize + 1,
        atyp => return Err(DecodeError::UnknownAddressType(atyp)),
    };

    let header_len = UDP_HEADER_FIXED_LEN + addr_len + 2;
    if n < header_len {
        return Err(DecodeError::HeaderTooShort { header_len, len: n });
    }

    Ok(header_len)
}

/// Strip the relay header and return the payload
pub fn decode_payload(datagram: &[u8]) -> Result<&[u8], DecodeError> {
    let offset = header_len(datagram)?;
    Ok(&datagram[offset..])
}

/// Decode `datagram` and copy its payload into `dst`
///
/// A payload larger than `dst` is truncated to `dst.len()` bytes; this is
/// not reported as an error.
pub fn copy_payload(datagram: &[u8], dst: &mut [u8]) -> Result<usize, DecodeError> {
    let payload = decode_payload(datagram)?;
    let n = payload.len().min(dst.len());
    if n < payload.len() {
        tracing::debug!(
            "SOCKS5 UDP payload truncated from {} to {} bytes",
            payload.len(),
            n
        );
    }
    dst[..n].copy_from_slice(&payload[..n]);
    Ok(n)
}
