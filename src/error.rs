//! Error types for socks5-udp
//!
//! This module defines the error taxonomy surfaced by the codec, the
//! control handshake and the association manager.

use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for SOCKS5 UDP operations
#[derive(Error, Debug)]
pub enum Socks5UdpError {
    /// Malformed `host:port` input
    #[error("failed to parse address {addr:?}: {reason}")]
    AddressParse {
        /// The offending input
        addr: String,
        /// Why it was rejected
        reason: String,
    },

    /// Address cannot be expressed as a SOCKS5 address type
    #[error("failed to append SOCKS5 address: {0}")]
    AddressFormat(String),

    /// Received datagram does not carry a valid SOCKS5 UDP header
    #[error("invalid SOCKS5 UDP packet: {0}")]
    Decode(#[from] DecodeError),

    /// Control channel handshake failed
    #[error("SOCKS5 handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// The datagram socket to the relay could not be opened
    #[error("failed to connect to packet endpoint {addr}: {source}")]
    DatagramDial {
        /// Resolved relay endpoint
        addr: String,
        /// Underlying dial error
        #[source]
        source: io::Error,
    },

    /// IO error on an established socket
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Socks5UdpError {
    pub(crate) fn address_parse(addr: &str, reason: impl Into<String>) -> Self {
        Socks5UdpError::AddressParse {
            addr: addr.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rejection reasons for an incoming SOCKS5 UDP datagram
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the smallest possible header
    #[error("too short: {0} bytes")]
    TooShort(usize),

    /// RSV field was not zero
    #[error("invalid reserved bytes: expected 0x0000, got {0:#06x}")]
    InvalidReserved(u16),

    /// FRAG field was not zero
    #[error("fragmentation is not supported (frag = {0})")]
    FragmentationUnsupported(u8),

    /// ATYP outside IPv4, domain name and IPv6
    #[error("unknown address type {0:#04x}")]
    UnknownAddressType(u8),

    /// Header computed from ATYP runs past the captured bytes
    #[error("header too short: header needs {header_len} bytes, datagram has {len}")]
    HeaderTooShort {
        /// Length the header claims
        header_len: usize,
        /// Captured datagram length
        len: usize,
    },
}

/// Control channel handshake errors
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// The control stream could not be established
    #[error("failed to connect to proxy {addr}: {source}")]
    Connect {
        /// Proxy server address
        addr: String,
        /// Underlying dial error
        #[source]
        source: io::Error,
    },

    /// IO error while talking to the server
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Server picked a method that was not offered
    #[error("Server selected unexpected method: {0:#04x}")]
    UnexpectedMethod(u8),

    /// Credentials rejected
    #[error("Authentication failed with status {0}")]
    AuthFailed(u8),

    /// Credentials do not fit RFC 1929 field limits
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Server replied with a failure code
    #[error("Server replied: {0}")]
    Reply(Socks5ReplyCode),

    /// Unknown reply code byte
    #[error("Unknown reply code: {0:#04x}")]
    UnknownReply(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Invalid domain name in reply
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// Request address cannot be encoded
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors collected while tearing down both channels of an association
#[derive(Error, Debug, Default)]
#[error("{}", describe_close(.datagram, .control))]
pub struct CloseError {
    /// Failure closing the datagram socket
    #[source]
    pub datagram: Option<io::Error>,
    /// Failure closing the control stream
    pub control: Option<io::Error>,
}

impl CloseError {
    pub(crate) fn into_result(self) -> Result<(), CloseError> {
        if self.datagram.is_none() && self.control.is_none() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn describe_close(datagram: &Option<io::Error>, control: &Option<io::Error>) -> String {
    match (datagram, control) {
        (Some(d), Some(c)) => format!("close datagram socket: {}; close control channel: {}", d, c),
        (Some(d), None) => format!("close datagram socket: {}", d),
        (None, Some(c)) => format!("close control channel: {}", c),
        (None, None) => "no error".to_string(),
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks5ReplyCode {
    type Error = HandshakeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Socks5ReplyCode::Succeeded),
            0x01 => Ok(Socks5ReplyCode::GeneralFailure),
            0x02 => Ok(Socks5ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(Socks5ReplyCode::NetworkUnreachable),
            0x04 => Ok(Socks5ReplyCode::HostUnreachable),
            0x05 => Ok(Socks5ReplyCode::ConnectionRefused),
            0x06 => Ok(Socks5ReplyCode::TtlExpired),
            0x07 => Ok(Socks5ReplyCode::CommandNotSupported),
            0x08 => Ok(Socks5ReplyCode::AddressTypeNotSupported),
            _ => Err(HandshakeError::UnknownReply(value)),
        }
    }
}

impl fmt::Display for Socks5ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Socks5ReplyCode::Succeeded => "succeeded",
            Socks5ReplyCode::GeneralFailure => "general SOCKS server failure",
            Socks5ReplyCode::ConnectionNotAllowed => "connection not allowed by ruleset",
            Socks5ReplyCode::NetworkUnreachable => "network unreachable",
            Socks5ReplyCode::HostUnreachable => "host unreachable",
            Socks5ReplyCode::ConnectionRefused => "connection refused",
            Socks5ReplyCode::TtlExpired => "TTL expired",
            Socks5ReplyCode::CommandNotSupported => "command not supported",
            Socks5ReplyCode::AddressTypeNotSupported => "address type not supported",
        };
        f.write_str(msg)
    }
}
