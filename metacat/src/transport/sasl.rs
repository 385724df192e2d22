// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! SASL-negotiating transport.
//!
//! Wraps the plain buffered transport by composition: `open` dials the raw
//! socket, runs the status-byte negotiation handshake, then hands the
//! authenticated stream to the plain framing. The bytes each mechanism
//! exchanges are opaque to the connection layer; only the handshake envelope
//! (status byte plus 4-byte length) is interpreted here.

use super::BufferedTransport;
use crate::client::{ClientError, Credentials};
use crate::endpoint::Endpoint;
use crate::net;
use bytes::Bytes;
use faststr::FastStr;
use std::fmt::Debug;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Negotiation status bytes, one per handshake message.
pub(crate) const STATUS_START: u8 = 0x01;
pub(crate) const STATUS_OK: u8 = 0x02;
pub(crate) const STATUS_BAD: u8 = 0x03;
pub(crate) const STATUS_ERROR: u8 = 0x04;
pub(crate) const STATUS_COMPLETE: u8 = 0x05;

// Negotiation payloads are handshake tokens, never catalog data.
const MAX_NEGOTIATION_PAYLOAD: usize = 64 * 1024;

/// Client side of one authentication mechanism.
///
/// Implementations produce the opaque byte tokens the negotiation carries;
/// the transport never inspects them.
pub trait Mechanism: Debug + Send {
    /// Mechanism name announced in the START message.
    fn name(&self) -> &str;
    /// The first token sent to the server.
    fn initial_response(&mut self) -> io::Result<Vec<u8>>;
    /// Answers a server challenge with the next token.
    fn evaluate_challenge(&mut self, challenge: &[u8]) -> io::Result<Vec<u8>>;
}

/// The PLAIN mechanism: `authzid NUL authcid NUL passwd`, no challenges.
#[derive(Debug)]
pub struct Plain {
    username: FastStr,
    password: FastStr,
}

impl Plain {
    pub(crate) fn from_credentials(credentials: &Credentials) -> Result<Self, ClientError> {
        let username = credentials
            .get("username")
            .cloned()
            .ok_or_else(|| ClientError::Configuration("PLAIN requires `username` in the credential configuration".into()))?;
        let password = credentials
            .get("password")
            .cloned()
            .ok_or_else(|| ClientError::Configuration("PLAIN requires `password` in the credential configuration".into()))?;
        Ok(Self { username, password })
    }
}

impl Mechanism for Plain {
    fn name(&self) -> &str {
        "PLAIN"
    }

    fn initial_response(&mut self) -> io::Result<Vec<u8>> {
        let mut token = Vec::with_capacity(self.username.len() + self.password.len() + 2);
        token.push(0);
        token.extend_from_slice(self.username.as_bytes());
        token.push(0);
        token.extend_from_slice(self.password.as_bytes());
        Ok(token)
    }

    fn evaluate_challenge(&mut self, _challenge: &[u8]) -> io::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

pub(crate) fn mechanism_for(name: &str, credentials: &Credentials) -> Result<Box<dyn Mechanism>, ClientError> {
    match name {
        "PLAIN" => Ok(Box::new(Plain::from_credentials(credentials)?)),
        other => Err(ClientError::Configuration(format!("unsupported auth mechanism `{other}`").into())),
    }
}

/// Authenticated transport: negotiates a mechanism on open, then reuses the
/// plain framing for catalog frames.
#[derive(Debug)]
pub struct SaslTransport {
    inner: BufferedTransport,
    service_host: FastStr,
    mechanism: Box<dyn Mechanism>,
}

impl SaslTransport {
    pub(crate) fn new(endpoint: Endpoint, credentials: &Credentials, max_frame_length: usize) -> Result<Self, ClientError> {
        let name = credentials.mechanism()?;
        let mechanism = mechanism_for(&name, credentials)?;
        let service_host = FastStr::new(endpoint.host());
        Ok(Self {
            inner: BufferedTransport::new(endpoint, max_frame_length),
            service_host,
            mechanism,
        })
    }

    /// Dials the endpoint, negotiates the mechanism, and installs the framing.
    pub async fn open(&mut self) -> io::Result<()> {
        let mut stream = net::dial(self.inner.endpoint()).await?;
        debug!(
            mechanism = self.mechanism.name(),
            service = %self.service_host,
            "starting sasl negotiation"
        );
        negotiate(&mut stream, self.mechanism.as_mut()).await?;
        self.inner.attach(stream);
        Ok(())
    }

    /// Sends one frame over the negotiated stream.
    pub async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        self.inner.send(frame).await
    }

    /// Receives one frame from the negotiated stream.
    pub async fn recv(&mut self) -> io::Result<Bytes> {
        self.inner.recv().await
    }

    /// Shuts the stream down and releases it.
    pub async fn close(&mut self) -> io::Result<()> {
        self.inner.close().await
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        self.inner.endpoint()
    }
}

/// Runs the client side of the handshake until the server completes or
/// rejects it.
pub(crate) async fn negotiate<S>(stream: &mut S, mechanism: &mut dyn Mechanism) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_message(stream, STATUS_START, mechanism.name().as_bytes()).await?;
    let initial = mechanism.initial_response()?;
    send_message(stream, STATUS_OK, &initial).await?;
    loop {
        let (status, payload) = recv_message(stream).await?;
        match status {
            STATUS_OK => {
                let answer = mechanism.evaluate_challenge(&payload)?;
                send_message(stream, STATUS_OK, &answer).await?;
            },
            STATUS_COMPLETE => return Ok(()),
            STATUS_BAD | STATUS_ERROR => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!(
                        "server rejected {} negotiation: {}",
                        mechanism.name(),
                        String::from_utf8_lossy(&payload)
                    ),
                ))
            },
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown negotiation status byte {other:#04x}"),
                ))
            },
        }
    }
}

pub(crate) async fn send_message<S>(stream: &mut S, status: u8, payload: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_u8(status).await?;
    stream.write_u32(payload.len() as u32).await?;
    stream.write_all(payload).await?;
    stream.flush().await
}

pub(crate) async fn recv_message<S>(stream: &mut S) -> io::Result<(u8, Vec<u8>)>
where
    S: AsyncRead + Unpin,
{
    let status = stream.read_u8().await?;
    let len = stream.read_u32().await? as usize;
    if len > MAX_NEGOTIATION_PAYLOAD {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negotiation payload of {len} bytes exceeds the handshake limit"),
        ));
    }
    let mut payload = vec![0; len];
    stream.read_exact(&mut payload).await?;
    Ok((status, payload))
}
