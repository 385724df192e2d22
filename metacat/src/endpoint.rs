// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! Endpoint parsing and round-robin selection over the configured pool.

use crate::client::ClientError;
use faststr::FastStr;
use std::fmt;

/// One addressable catalog server instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: FastStr,
    port: u16,
}

impl Endpoint {
    /// Parses a single `scheme://host:port` or bare `host:port` string.
    ///
    /// The scheme, when present, is accepted and discarded; the catalog
    /// protocol does not vary with it.
    pub fn parse(uri: &str) -> Result<Self, ClientError> {
        let rest = match uri.split_once("://") {
            Some((_, rest)) => rest,
            None => uri,
        };
        let rest = rest.trim_end_matches('/');
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| ClientError::Configuration(format!("endpoint `{uri}` is missing a port").into()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(ClientError::Configuration(format!("endpoint `{uri}` is missing a host").into()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| ClientError::Configuration(format!("endpoint `{uri}` has an invalid port `{port}`").into()))?;
        Ok(Self { host: FastStr::new(host), port })
    }

    /// The hostname, also used as the service binding for SASL negotiation.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The TCP port.
    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An ordered, fixed set of endpoints plus a rotation cursor.
///
/// The pool holds no liveness state: it does not remember which endpoints
/// failed, which keeps selection deterministic and failover reproducible.
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
    cursor: usize,
}

impl EndpointPool {
    /// Parses a comma-separated endpoint list into a pool.
    ///
    /// Fails with [`ClientError::Configuration`] if any entry is malformed or
    /// if the list would produce an empty pool.
    pub fn from_dsn(dsn: &str) -> Result<Self, ClientError> {
        let mut endpoints = Vec::new();
        for part in dsn.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            endpoints.push(Endpoint::parse(part)?);
        }
        if endpoints.is_empty() {
            return Err(ClientError::Configuration("endpoint list is empty".into()));
        }
        Ok(Self { endpoints, cursor: 0 })
    }

    /// Returns the endpoint at the cursor and advances by one, wrapping after
    /// the last element. Never fails and is safe to call without bound.
    pub fn next(&mut self) -> Endpoint {
        let endpoint = self.endpoints[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.endpoints.len();
        endpoint
    }

    /// Number of endpoints in the pool.
    #[inline]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the pool is empty. Construction guarantees it never is.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// The configured endpoints, in rotation order.
    #[inline]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::{Endpoint, EndpointPool};
    use crate::client::ClientError;
    use assert_matches::assert_matches;

    #[test]
    fn parse_uri_forms() {
        let endpoint = Endpoint::parse("thrift://meta1.example.com:9083").unwrap();
        assert_eq!(endpoint.host(), "meta1.example.com");
        assert_eq!(endpoint.port(), 9083);

        let bare = Endpoint::parse("127.0.0.1:9083").unwrap();
        assert_eq!(bare.to_string(), "127.0.0.1:9083");

        let v6 = Endpoint::parse("thrift://[::1]:9083").unwrap();
        assert_eq!(v6.host(), "::1");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_matches!(Endpoint::parse("meta1.example.com"), Err(ClientError::Configuration(_)));
        assert_matches!(Endpoint::parse("thrift://:9083"), Err(ClientError::Configuration(_)));
        assert_matches!(Endpoint::parse("thrift://meta1:notaport"), Err(ClientError::Configuration(_)));
    }

    #[test]
    fn empty_dsn_is_a_configuration_error() {
        assert_matches!(EndpointPool::from_dsn(""), Err(ClientError::Configuration(_)));
        assert_matches!(EndpointPool::from_dsn(" , ,"), Err(ClientError::Configuration(_)));
    }

    #[test]
    fn rotation_visits_each_endpoint_once_then_wraps() {
        let mut pool = EndpointPool::from_dsn("thrift://a:1,thrift://b:2,thrift://c:3").unwrap();
        let first: Vec<String> = (0..pool.len()).map(|_| pool.next().to_string()).collect();
        assert_eq!(first, vec!["a:1", "b:2", "c:3"]);
        // The (N+1)-th selection repeats the first endpoint.
        assert_eq!(pool.next().to_string(), "a:1");
    }

    #[test]
    fn single_endpoint_rotates_onto_itself() {
        let mut pool = EndpointPool::from_dsn("thrift://only:9083").unwrap();
        assert_eq!(pool.next().to_string(), "only:9083");
        assert_eq!(pool.next().to_string(), "only:9083");
    }
}
