// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! metacat is a failover-aware Rust client for multi-endpoint metadata catalog RPC services.
//!
//! A [`Client`] holds a fixed pool of endpoints parsed from a comma-separated
//! DSN and an optional credential configuration. [`Client::connect`] rotates
//! through the pool round-robin, opens a plain or SASL-negotiating transport
//! to the selected endpoint, and fails over to the next endpoint until either
//! an open succeeds or a full rotation's worth of consecutive failures has
//! accumulated. A successful open yields a [`Session`] that forwards catalog
//! operations over a binary codec without any retry of its own.
#![deny(missing_docs)]
#![allow(clippy::type_complexity)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod context;
pub mod endpoint;
mod net;
pub mod proto;
pub mod transport;

pub use crate::client::{Client, ClientBuilder, ClientError, Credentials, RpcError, Session};
pub use crate::context::Context;
pub use crate::endpoint::{Endpoint, EndpointPool};
