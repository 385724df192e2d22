// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Session lifecycle and catalog call passthrough.

mod support;

use assert_matches::assert_matches;
use metacat::proto::{Database, ServerErrorKind};
use metacat::{Client, ClientError, Context, Credentials, RpcError};
use std::time::Duration;

#[tokio::test]
async fn catalog_calls_pass_through_unchanged() {
    let (listener, live) = support::bind().await;
    support::serve(listener, support::demo_responder);

    let client = Client::from_dsn(live).unwrap();
    let mut session = client.connect().await.unwrap();

    assert_eq!(session.get_all_databases().await.unwrap(), ["analytics", "default"]);
    assert_eq!(session.get_role_names().await.unwrap(), ["admin"]);
    assert!(session.create_role("admin".to_string(), "hue".to_string()).await.unwrap());
    session.create_database(Database::default()).await.unwrap();

    session.close().await.unwrap();
}

#[tokio::test]
async fn server_errors_surface_with_their_kind() {
    let (listener, live) = support::bind().await;
    support::serve(listener, support::demo_responder);

    let client = Client::from_dsn(live).unwrap();
    let mut session = client.connect().await.unwrap();

    let error = session.get_database("missing".to_string()).await.unwrap_err();
    assert_matches!(
        error,
        ClientError::Rpc(RpcError::Server(ref server)) if server.kind == ServerErrorKind::NotFound
    );

    session.close().await.unwrap();
}

#[tokio::test]
async fn calls_after_close_report_the_session_as_closed() {
    let (listener, live) = support::bind().await;
    support::serve(listener, support::demo_responder);

    let client = Client::from_dsn(live).unwrap();
    let mut session = client.connect().await.unwrap();
    session.close().await.unwrap();

    let error = session.get_all_databases().await.unwrap_err();
    assert_matches!(error, ClientError::Rpc(RpcError::Closed));

    let error = session.close().await.unwrap_err();
    assert_matches!(error, ClientError::Rpc(RpcError::Closed));
}

#[tokio::test]
async fn a_silent_server_trips_the_context_deadline() {
    // Bound but never served: the accept queue completes the dial, and no
    // response ever comes back.
    let (listener, live) = support::bind().await;

    let client = Client::from_dsn(live).unwrap();
    let mut session = client.connect().await.unwrap();
    session.set_context(Context::new_root().with_deadline_after(Duration::from_millis(50)));

    let error = session.get_all_databases().await.unwrap_err();
    assert_matches!(error, ClientError::Rpc(RpcError::DeadlineExceeded));

    drop(listener);
}

#[tokio::test]
async fn duplicate_produces_an_independent_session() {
    let (listener, live) = support::bind().await;
    support::serve(listener, support::demo_responder);

    let client = Client::from_dsn(live).unwrap();
    let mut first = client.connect().await.unwrap();
    let mut second = first.duplicate().await.unwrap();

    first.close().await.unwrap();
    assert_eq!(second.get_all_databases().await.unwrap(), ["analytics", "default"]);
    second.close().await.unwrap();
}

fn plain_credentials(password: &'static str) -> Credentials {
    Credentials::new([
        ("auth_mechanisms", "PLAIN"),
        ("username", "hue"),
        ("password", password),
    ])
}

#[tokio::test]
async fn authenticated_sessions_negotiate_before_serving_calls() {
    let (listener, live) = support::bind().await;
    support::serve_sasl(listener, "hunter2", support::demo_responder);

    let client = Client::builder(live)
        .with_credentials(plain_credentials("hunter2"))
        .try_build()
        .unwrap();
    let mut session = client.connect().await.unwrap();

    assert_eq!(session.get_all_databases().await.unwrap(), ["analytics", "default"]);
    session.close().await.unwrap();
}

#[tokio::test]
async fn a_rejected_handshake_counts_as_an_open_failure() {
    let (listener, live) = support::bind().await;
    support::serve_sasl(listener, "hunter2", support::demo_responder);

    let client = Client::builder(live)
        .with_credentials(plain_credentials("wrong"))
        .try_build()
        .unwrap();

    let error = client.connect().await.unwrap_err();
    assert_matches!(
        error,
        ClientError::ServersUnavailable {
            attempts: 2,
            last: Some(ref cause),
        } if matches!(**cause, ClientError::TransportOpen { .. })
    );
}
