// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! Connection establishment and failover for the catalog client.
//!
//! A [`Client`] is long lived and shared; it owns the endpoint pool, the
//! credential configuration, and a client-wide failure counter. Every
//! [`Client::connect`] rotates the pool round-robin and opens a transport to
//! the selected endpoint, failing over to the next endpoint on open errors.
//! Once the counter exceeds the pool size, which means a full rotation's
//! worth of consecutive failures, connect gives up with
//! [`ClientError::ServersUnavailable`]. Any successful open resets the
//! counter, so one bad rotation does not permanently poison the client.

mod session;
mod stub;

pub use session::Session;
pub use stub::RpcError;

use crate::context::Context;
use crate::endpoint::EndpointPool;
use crate::transport::{Transport, DEFAULT_MAX_FRAME_LENGTH};
use faststr::FastStr;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use stub::CatalogStub;
use tracing::{debug, warn};

/// The credential key that selects the authentication mechanism.
pub const AUTH_MECHANISMS_KEY: &str = "auth_mechanisms";

/// Errors surfaced by connection establishment and catalog calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The client was configured with something no endpoint can fix:
    /// malformed endpoint list, empty pool, or a bad credential shape.
    /// Never retried and never counted against the failure window.
    #[error("invalid client configuration: {0}")]
    Configuration(FastStr),
    /// One endpoint could not be dialed or failed its handshake. Absorbed by
    /// the retry loop; only the last one is surfaced, as the cause inside
    /// [`ClientError::ServersUnavailable`].
    #[error("could not open transport to {endpoint}: {source}")]
    TransportOpen {
        /// The endpoint whose open attempt failed.
        endpoint: FastStr,
        /// The underlying dial or handshake failure.
        #[source]
        source: io::Error,
    },
    /// Every endpoint failed within the current failure window.
    #[error("servers are unavailable after {attempts} consecutive failed attempts")]
    ServersUnavailable {
        /// Consecutive failed open attempts accumulated on the client.
        attempts: usize,
        /// The most recent open failure, when this call observed one.
        #[source]
        last: Option<Box<ClientError>>,
    },
    /// A call on an established session failed; passed through unchanged.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Credential configuration handed opaquely to the authentication transport.
///
/// Its presence on a client selects the SASL transport; the
/// [`AUTH_MECHANISMS_KEY`] entry names the mechanism and every other entry is
/// mechanism-specific.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    options: HashMap<FastStr, FastStr>,
}

impl Credentials {
    /// Builds the credential map from key/value pairs.
    pub fn new<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FastStr>,
        V: Into<FastStr>,
    {
        Self {
            options: options.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Looks up one option.
    pub fn get(&self, key: &str) -> Option<&FastStr> {
        self.options.get(key)
    }

    /// The configured mechanism name.
    ///
    /// Its absence is a configuration error, not a connection error: it is
    /// reported before any network attempt and never enters the retry loop.
    pub fn mechanism(&self) -> Result<FastStr, ClientError> {
        self.get(AUTH_MECHANISMS_KEY).cloned().ok_or_else(|| {
            ClientError::Configuration(format!("`{AUTH_MECHANISMS_KEY}` must be set in the credential configuration").into())
        })
    }
}

/// A builder for [`Client`].
#[non_exhaustive]
pub struct ClientBuilder {
    dsn: FastStr,
    credentials: Option<Credentials>,
    max_frame_length: usize,
}

impl ClientBuilder {
    pub(crate) fn new(dsn: impl Into<FastStr>) -> Self {
        Self {
            dsn: dsn.into(),
            credentials: None,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }

    /// Attaches credential configuration; its presence selects the
    /// authenticating transport for every connection.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Frame size ceiling for catalog payloads.
    /// Default is [`DEFAULT_MAX_FRAME_LENGTH`], 24 MiB.
    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Parses the endpoint list and produces a client.
    pub fn try_build(self) -> Result<Client, ClientError> {
        let pool = EndpointPool::from_dsn(&self.dsn)?;
        Ok(Client {
            shared: Arc::new(Shared {
                credentials: self.credentials,
                max_frame_length: self.max_frame_length,
                state: Mutex::new(PoolState { pool, failures: 0 }),
            }),
        })
    }
}

/// A long-lived catalog client: endpoint pool, credential configuration, and
/// the failure counter governing when connects give up.
///
/// Cloning is cheap and shares all of that state, so concurrent connects
/// observe one rotation cursor and one failure window.
#[derive(Debug, Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    credentials: Option<Credentials>,
    max_frame_length: usize,
    // One lock covers the cursor and the counter: the give-up decision and
    // the endpoint selection must be observed consistently.
    state: Mutex<PoolState>,
}

#[derive(Debug)]
struct PoolState {
    pool: EndpointPool,
    failures: usize,
}

impl Client {
    /// Starts a builder over a comma-separated `scheme://host:port` list.
    pub fn builder(dsn: impl Into<FastStr>) -> ClientBuilder {
        ClientBuilder::new(dsn)
    }

    /// Parses a DSN into a client with no credentials and default settings.
    pub fn from_dsn(dsn: impl Into<FastStr>) -> Result<Self, ClientError> {
        Self::builder(dsn).try_build()
    }

    /// Consecutive failed open attempts currently accumulated; the give-up
    /// input for the next [`connect`](Client::connect).
    pub fn failures(&self) -> usize {
        self.shared.lock_state().failures
    }

    /// Number of configured endpoints.
    pub fn pool_size(&self) -> usize {
        self.shared.lock_state().pool.len()
    }

    /// Establishes a session, failing over across the pool.
    ///
    /// Selection is round-robin; each open failure advances to the next
    /// endpoint and increments the failure counter, so one call makes at
    /// most `pool size + 1` attempts before giving up. A successful open
    /// resets the counter to zero. Configuration errors propagate
    /// immediately without touching the counter.
    pub async fn connect(&self) -> Result<Session, ClientError> {
        Shared::connect(&self.shared).await
    }
}

impl Shared {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) async fn connect(shared: &Arc<Shared>) -> Result<Session, ClientError> {
        let mut last_open_error: Option<ClientError> = None;
        loop {
            let endpoint = {
                let mut state = shared.lock_state();
                if state.failures > state.pool.len() {
                    let attempts = state.failures;
                    debug!(attempts, "giving up: the failure window covers the whole pool");
                    return Err(ClientError::ServersUnavailable {
                        attempts,
                        last: last_open_error.take().map(Box::new),
                    });
                }
                state.pool.next()
            };
            let mut transport = Transport::build(endpoint.clone(), shared.credentials.as_ref(), shared.max_frame_length)?;
            match transport.open().await {
                Ok(()) => {
                    shared.lock_state().failures = 0;
                    debug!(%endpoint, "transport opened");
                    return Ok(Session::new(CatalogStub::new(transport), Context::new_root(), Arc::clone(shared)));
                },
                Err(source) => {
                    let failures = {
                        let mut state = shared.lock_state();
                        state.failures += 1;
                        state.failures
                    };
                    warn!(%endpoint, failures, error = %source, "failed to open transport, rotating to the next endpoint");
                    last_open_error = Some(ClientError::TransportOpen {
                        endpoint: FastStr::new(endpoint.to_string()),
                        source,
                    });
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, ClientError, Credentials};
    use assert_matches::assert_matches;

    #[test]
    fn missing_mechanism_key_is_a_configuration_error() {
        let credentials = Credentials::new([("service", "metacat")]);
        assert_matches!(credentials.mechanism(), Err(ClientError::Configuration(_)));
    }

    #[test]
    fn mechanism_key_is_read_back() {
        let credentials = Credentials::new([("auth_mechanisms", "PLAIN")]);
        assert_eq!(credentials.mechanism().unwrap(), "PLAIN");
    }

    #[test]
    fn builder_rejects_an_empty_dsn() {
        assert_matches!(Client::from_dsn(""), Err(ClientError::Configuration(_)));
    }

    #[test]
    fn fresh_client_has_a_clean_failure_window() {
        let client = Client::from_dsn("thrift://a:1,thrift://b:2").unwrap();
        assert_eq!(client.pool_size(), 2);
        assert_eq!(client.failures(), 0);
    }
}
