//! SOCKS5 client handshake
//!
//! Drives the control channel from the client side: method negotiation,
//! optional RFC 1929 username/password authentication, and a single
//! command request whose reply carries the server's bind address.

use super::consts::*;
use super::types::{SocksCommand, TargetAddr};
use crate::error::{HandshakeError, Socks5ReplyCode};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Authentication method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// Username/password authentication
    Password,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::None),
            SOCKS5_AUTH_METHOD_PASSWORD => Some(AuthMethod::Password),
            _ => None,
        }
    }
}

/// Username/password pair for RFC 1929 authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username, 1 to 255 bytes
    pub username: String,
    /// Password, 1 to 255 bytes
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Methods offered in the greeting, in preference order
fn offered_methods(credentials: Option<&Credentials>) -> Vec<u8> {
    let mut methods = vec![SOCKS5_AUTH_METHOD_NONE];
    if credentials.is_some() {
        methods.push(SOCKS5_AUTH_METHOD_PASSWORD);
    }
    methods
}

/// Negotiate the authentication method and authenticate if required
///
/// ```text
/// +----+----------+----------+      +----+--------+
/// |VER | NMETHODS | METHODS  |  ->  |VER | METHOD |
/// +----+----------+----------+      +----+--------+
/// | 1  |    1     | 1 to 255 |      | 1  |   1    |
/// +----+----------+----------+      +----+--------+
/// ```
pub async fn negotiate<S>(
    stream: &mut S,
    credentials: Option<&Credentials>,
) -> Result<AuthMethod, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let methods = offered_methods(credentials);

    let mut greeting = Vec::with_capacity(2 + methods.len());
    greeting.push(SOCKS5_VERSION);
    greeting.push(methods.len() as u8);
    greeting.extend_from_slice(&methods);
    stream.write_all(&greeting).await?;
    stream.flush().await?;

    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    if buf[0] != SOCKS5_VERSION {
        return Err(HandshakeError::UnsupportedVersion(buf[0]));
    }
    if buf[1] == SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE {
        return Err(HandshakeError::NoAcceptableMethod);
    }
    if !methods.contains(&buf[1]) {
        return Err(HandshakeError::UnexpectedMethod(buf[1]));
    }

    let method = AuthMethod::from_byte(buf[1]).ok_or(HandshakeError::UnexpectedMethod(buf[1]))?;
    tracing::trace!("SOCKS5 server selected auth method {:?}", method);

    if let (AuthMethod::Password, Some(credentials)) = (method, credentials) {
        authenticate_password(stream, credentials).await?;
    }

    Ok(method)
}

/// Perform username/password authentication
///
/// ```text
/// +----+------+----------+------+----------+      +----+--------+
/// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |  ->  |VER | STATUS |
/// +----+------+----------+------+----------+      +----+--------+
/// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |      | 1  |   1    |
/// +----+------+----------+------+----------+      +----+--------+
/// ```
pub async fn authenticate_password<S>(
    stream: &mut S,
    credentials: &Credentials,
) -> Result<(), HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let username = credentials.username.as_bytes();
    let password = credentials.password.as_bytes();

    if username.is_empty() || username.len() > 255 {
        return Err(HandshakeError::InvalidCredentials(
            "username must be 1 to 255 bytes".to_string(),
        ));
    }
    if password.is_empty() || password.len() > 255 {
        return Err(HandshakeError::InvalidCredentials(
            "password must be 1 to 255 bytes".to_string(),
        ));
    }

    let mut request = Vec::with_capacity(3 + username.len() + password.len());
    request.push(SOCKS5_AUTH_VERSION);
    request.push(username.len() as u8);
    request.extend_from_slice(username);
    request.push(password.len() as u8);
    request.extend_from_slice(password);
    stream.write_all(&request).await?;
    stream.flush().await?;

    let mut response = [0u8; 2];
    stream.read_exact(&mut response).await?;

    if response[0] != SOCKS5_AUTH_VERSION {
        return Err(HandshakeError::UnsupportedVersion(response[0]));
    }
    if response[1] != SOCKS5_AUTH_STATUS_SUCCESS {
        return Err(HandshakeError::AuthFailed(response[1]));
    }

    tracing::debug!("SOCKS5 authentication succeeded for user {}", credentials.username);
    Ok(())
}

/// Send a command request
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
pub async fn send_request<S>(
    stream: &mut S,
    command: SocksCommand,
    addr: &TargetAddr,
) -> Result<(), HandshakeError>
where
    S: AsyncWrite + Unpin,
{
    let mut request = Vec::with_capacity(3 + addr.serialized_len());
    request.push(SOCKS5_VERSION);
    request.push(command.to_byte());
    request.push(SOCKS5_RESERVED);
    addr.append_to(&mut request)
        .map_err(|e| HandshakeError::InvalidAddress(e.to_string()))?;

    stream.write_all(&request).await?;
    stream.flush().await?;

    Ok(())
}

/// Read a command reply and return the bound address
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
pub async fn read_reply<S>(stream: &mut S) -> Result<TargetAddr, HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let reply = header[1];
    let addr_type = header[3];

    if version != SOCKS5_VERSION {
        return Err(HandshakeError::UnsupportedVersion(version));
    }
    if reply != SOCKS5_REPLY_SUCCEEDED {
        return Err(HandshakeError::Reply(Socks5ReplyCode::try_from(reply)?));
    }

    TargetAddr::read_from(stream, addr_type).await
}

/// Run the complete client handshake for `command`
///
/// Returns the bind address the server reported.
pub async fn handshake<S>(
    stream: &mut S,
    credentials: Option<&Credentials>,
    command: SocksCommand,
    addr: &TargetAddr,
) -> Result<TargetAddr, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    negotiate(stream, credentials).await?;
    send_request(stream, command, addr).await?;
    let bound = read_reply(stream).await?;

    tracing::debug!("SOCKS5 {} to {} bound at {}", command, addr, bound);

    Ok(bound)
}
