// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! The bound RPC stub: one opened transport plus the binary codec.

use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::proto::{CatalogRequest, CatalogResponse, ServerError};
use crate::transport::Transport;
use std::io;
use std::time::Instant;

/// Errors produced while issuing calls on an established session.
///
/// These pass through the connection layer unchanged: a session carries no
/// retry or failover of its own, that is resolved before it exists.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The transport was already released by a close.
    #[error("the transport is closed")]
    Closed,
    /// The context deadline elapsed before a response arrived.
    #[error("the request exceeded its deadline")]
    DeadlineExceeded,
    /// The server processed the request and reported a failure.
    #[error("the server rejected the request: {0}")]
    Server(#[from] ServerError),
    /// A frame could not move across the transport.
    #[error("could not transfer the request: {0}")]
    Transport(#[source] io::Error),
    /// A message could not be encoded or decoded.
    #[error("could not encode or decode a message: {0}")]
    Codec(#[from] bincode::Error),
    /// The server answered with a frame that does not match the request.
    #[error("out-of-protocol response to `{0}`")]
    UnexpectedResponse(&'static str),
}

impl From<io::Error> for RpcError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::NotConnected {
            RpcError::Closed
        } else {
            RpcError::Transport(error)
        }
    }
}

/// One opened transport bound to the catalog wire protocol.
#[derive(Debug)]
pub struct CatalogStub {
    transport: Transport,
}

impl CatalogStub {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Issues one request and decodes its paired response, bounded by the
    /// context deadline when one is set.
    pub(crate) async fn call(&mut self, context: &Context, request: CatalogRequest) -> Result<CatalogResponse, RpcError> {
        let frame = bincode::serialize(&request)?;
        let transport = &mut self.transport;
        let exchange = async move {
            transport.send(frame.into()).await?;
            transport.recv().await
        };
        let reply = match context.deadline {
            Some(deadline) => {
                let budget = deadline.saturating_duration_since(Instant::now());
                tokio::time::timeout(budget, exchange)
                    .await
                    .map_err(|_| RpcError::DeadlineExceeded)??
            },
            None => exchange.await?,
        };
        Ok(bincode::deserialize(&reply)?)
    }

    /// Releases the transport. A second close reports [`RpcError::Closed`].
    pub(crate) async fn close(&mut self) -> Result<(), RpcError> {
        self.transport.close().await.map_err(Into::into)
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }
}
