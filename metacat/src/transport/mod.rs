// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! Byte transports for catalog connections.
//!
//! A [`Transport`] is built for exactly one endpoint and performs no I/O
//! until [`Transport::open`] is called; that split keeps open failures
//! attributable to a single connection attempt so the client can count them.
//! The variant is selected once at build time: credentialed configurations
//! get a SASL-negotiating wrapper around the plain framing, everything else
//! gets the plain framing directly.

pub mod sasl;

use crate::client::{ClientError, Credentials};
use crate::endpoint::Endpoint;
use crate::net;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use sasl::SaslTransport;
use std::io;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Frame size ceiling for catalog payloads unless configured otherwise.
///
/// A tunable, not a protocol invariant: it only needs to be large enough for
/// typical catalog entities.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 24 * 1024 * 1024;

pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport is closed")
}

/// A byte transport bound to one endpoint.
#[derive(Debug)]
pub enum Transport {
    /// Plain length-delimited framing over TCP.
    Buffered(BufferedTransport),
    /// SASL-negotiating wrapper around the plain framing.
    Sasl(SaslTransport),
}

impl Transport {
    /// Selects and constructs the transport variant for one endpoint.
    ///
    /// No I/O happens here. Credentials that are present but missing the
    /// mechanism key fail with [`ClientError::Configuration`]; that failure
    /// is endpoint-independent and must never enter the retry loop.
    pub fn build(endpoint: Endpoint, credentials: Option<&Credentials>, max_frame_length: usize) -> Result<Self, ClientError> {
        match credentials {
            None => Ok(Transport::Buffered(BufferedTransport::new(endpoint, max_frame_length))),
            Some(credentials) => Ok(Transport::Sasl(SaslTransport::new(endpoint, credentials, max_frame_length)?)),
        }
    }

    /// Dials the endpoint, negotiates authentication when credentialed, and
    /// readies the transport for frames.
    pub async fn open(&mut self) -> io::Result<()> {
        match self {
            Transport::Buffered(transport) => transport.open().await,
            Transport::Sasl(transport) => transport.open().await,
        }
    }

    /// Sends one frame.
    pub async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        match self {
            Transport::Buffered(transport) => transport.send(frame).await,
            Transport::Sasl(transport) => transport.send(frame).await,
        }
    }

    /// Receives one frame.
    pub async fn recv(&mut self) -> io::Result<Bytes> {
        match self {
            Transport::Buffered(transport) => transport.recv().await,
            Transport::Sasl(transport) => transport.recv().await,
        }
    }

    /// Shuts the stream down and releases it.
    ///
    /// Not idempotent: a second close reports the transport as closed.
    pub async fn close(&mut self) -> io::Result<()> {
        match self {
            Transport::Buffered(transport) => transport.close().await,
            Transport::Sasl(transport) => transport.close().await,
        }
    }

    /// The endpoint this transport was built for.
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Transport::Buffered(transport) => transport.endpoint(),
            Transport::Sasl(transport) => transport.endpoint(),
        }
    }
}

/// Plain transport: 4-byte length-prefixed frames with a fixed ceiling.
#[derive(Debug)]
pub struct BufferedTransport {
    endpoint: Endpoint,
    max_frame_length: usize,
    framed: Option<Framed<TcpStream, LengthDelimitedCodec>>,
}

impl BufferedTransport {
    pub(crate) fn new(endpoint: Endpoint, max_frame_length: usize) -> Self {
        Self {
            endpoint,
            max_frame_length,
            framed: None,
        }
    }

    /// Dials the endpoint and installs the framing.
    pub async fn open(&mut self) -> io::Result<()> {
        let stream = net::dial(&self.endpoint).await?;
        self.attach(stream);
        Ok(())
    }

    /// Wraps an already-negotiated stream in the length-delimited framing.
    pub(crate) fn attach(&mut self, stream: TcpStream) {
        self.framed = Some(
            LengthDelimitedCodec::builder()
                .max_frame_length(self.max_frame_length)
                .new_framed(stream),
        );
    }

    /// Sends one frame.
    pub async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        let framed = self.framed.as_mut().ok_or_else(closed_error)?;
        framed.send(frame).await
    }

    /// Receives one frame.
    pub async fn recv(&mut self) -> io::Result<Bytes> {
        let framed = self.framed.as_mut().ok_or_else(closed_error)?;
        match framed.next().await {
            Some(frame) => Ok(frame?.freeze()),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "server closed the connection")),
        }
    }

    /// Shuts the stream down and releases it.
    pub async fn close(&mut self) -> io::Result<()> {
        let mut framed = self.framed.take().ok_or_else(closed_error)?;
        framed.get_mut().shutdown().await
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}
