// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Connection establishment and failover across the endpoint pool.

mod support;

use assert_matches::assert_matches;
use metacat::{Client, ClientError, Credentials};

#[tokio::test]
async fn connect_rotates_past_dead_endpoints_to_the_live_one() {
    let dead_a = support::refused_endpoint().await;
    let dead_b = support::refused_endpoint().await;
    let (listener, live) = support::bind().await;
    support::serve(listener, support::demo_responder);

    let client = Client::from_dsn(format!("{dead_a},{dead_b},{live}")).unwrap();
    let mut session = client.connect().await.unwrap();

    assert_eq!(format!("thrift://{}", session.endpoint()), live);
    assert_eq!(client.failures(), 0);
    session.close().await.unwrap();
}

#[tokio::test]
async fn connect_gives_up_after_a_full_rotation_of_failures() {
    let mut endpoints = Vec::new();
    for _ in 0..3 {
        endpoints.push(support::refused_endpoint().await);
    }
    let client = Client::from_dsn(endpoints.join(",")).unwrap();

    let error = client.connect().await.unwrap_err();
    assert_matches!(
        error,
        ClientError::ServersUnavailable {
            attempts: 4,
            last: Some(ref cause),
        } if matches!(**cause, ClientError::TransportOpen { .. })
    );
    assert_eq!(client.failures(), 4);

    // The window is already exhausted, so the next connect fails without
    // dialing anything.
    let error = client.connect().await.unwrap_err();
    assert_matches!(error, ClientError::ServersUnavailable { attempts: 4, last: None });
}

#[tokio::test]
async fn a_single_endpoint_is_retried_before_giving_up() {
    let dead = support::refused_endpoint().await;
    let client = Client::from_dsn(dead).unwrap();

    // One failure leaves the counter at 1, which does not exceed a pool of
    // size 1, so the same endpoint is tried a second time.
    let error = client.connect().await.unwrap_err();
    assert_matches!(error, ClientError::ServersUnavailable { attempts: 2, .. });
}

#[tokio::test]
async fn a_successful_open_resets_the_failure_window() {
    let dead = support::refused_endpoint().await;
    let (listener, live) = support::bind().await;
    support::serve(listener, support::demo_responder);

    let client = Client::from_dsn(format!("{dead},{live}")).unwrap();

    let mut first = client.connect().await.unwrap();
    assert_eq!(format!("thrift://{}", first.endpoint()), live);
    assert_eq!(client.failures(), 0);

    // The rotation has wrapped back to the dead endpoint; a fresh budget
    // still carries the second connect to the live one.
    let mut second = client.connect().await.unwrap();
    assert_eq!(format!("thrift://{}", second.endpoint()), live);
    assert_eq!(client.failures(), 0);

    first.close().await.unwrap();
    second.close().await.unwrap();
}

#[tokio::test]
async fn missing_mechanism_key_fails_before_any_network_attempt() {
    // A refused endpoint would turn any dial into a counted open failure,
    // so a clean counter proves the configuration check came first.
    let dead = support::refused_endpoint().await;
    let client = Client::builder(dead)
        .with_credentials(Credentials::new([("username", "hue"), ("password", "hunter2")]))
        .try_build()
        .unwrap();

    let error = client.connect().await.unwrap_err();
    assert_matches!(error, ClientError::Configuration(_));
    assert_eq!(client.failures(), 0);
}

#[tokio::test]
async fn clones_share_one_failure_window() {
    let dead = support::refused_endpoint().await;
    let client = Client::from_dsn(dead).unwrap();
    let clone = client.clone();

    let _ = client.connect().await.unwrap_err();
    assert_eq!(clone.failures(), client.failures());
}
