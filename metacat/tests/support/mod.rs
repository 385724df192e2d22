// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! In-process catalog servers for the integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use metacat::proto::{CatalogRequest, CatalogResponse, ServerError, ServerErrorKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::LengthDelimitedCodec;

pub type Responder = fn(CatalogRequest) -> CatalogResponse;

/// Binds a fresh listener and returns it with its `thrift://` DSN entry.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dsn = format!("thrift://{}", listener.local_addr().unwrap());
    (listener, dsn)
}

/// Returns a DSN entry whose port refuses connections.
pub async fn refused_endpoint() -> String {
    let (listener, dsn) = bind().await;
    drop(listener);
    dsn
}

/// Accepts connections forever, answering every request via `respond`.
pub fn serve(listener: TcpListener, respond: Responder) {
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle(stream, respond));
        }
    });
}

async fn handle(stream: TcpStream, respond: Responder) {
    let mut framed = LengthDelimitedCodec::builder().new_framed(stream);
    while let Some(Ok(frame)) = framed.next().await {
        let request: CatalogRequest = bincode::deserialize(&frame).unwrap();
        let response = respond(request);
        if framed.send(Bytes::from(bincode::serialize(&response).unwrap())).await.is_err() {
            break;
        }
    }
}

/// Accepts connections forever, requiring a PLAIN handshake for user `hue`
/// with the given password before serving requests.
pub fn serve_sasl(listener: TcpListener, password: &'static str, respond: Responder) {
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle_sasl(stream, password, respond));
        }
    });
}

async fn handle_sasl(mut stream: TcpStream, password: &'static str, respond: Responder) {
    let (status, mechanism) = read_message(&mut stream).await;
    assert_eq!(status, 0x01, "expected a START message");
    assert_eq!(mechanism, b"PLAIN");

    let (status, token) = read_message(&mut stream).await;
    assert_eq!(status, 0x02, "expected the initial response");
    if token != format!("\0hue\0{password}").into_bytes() {
        write_message(&mut stream, 0x03, b"authentication failed").await;
        return;
    }
    write_message(&mut stream, 0x05, b"").await;

    handle(stream, respond).await;
}

async fn read_message(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let status = stream.read_u8().await.unwrap();
    let len = stream.read_u32().await.unwrap() as usize;
    let mut payload = vec![0; len];
    stream.read_exact(&mut payload).await.unwrap();
    (status, payload)
}

async fn write_message(stream: &mut TcpStream, status: u8, payload: &[u8]) {
    stream.write_u8(status).await.unwrap();
    stream.write_u32(payload.len() as u32).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.flush().await.unwrap();
}

/// A responder with a couple of canned answers for passthrough assertions.
pub fn demo_responder(request: CatalogRequest) -> CatalogResponse {
    match request {
        CatalogRequest::GetAllDatabases {} => CatalogResponse::Names(vec!["analytics".to_string(), "default".to_string()]),
        CatalogRequest::GetRoleNames {} => CatalogResponse::Names(vec!["admin".to_string()]),
        CatalogRequest::CreateRole { .. } => CatalogResponse::Flag(true),
        CatalogRequest::CreateDatabase { .. } => CatalogResponse::Unit(()),
        CatalogRequest::GetDatabase { name } => CatalogResponse::Error(ServerError {
            kind: ServerErrorKind::NotFound,
            message: format!("database `{name}`"),
        }),
        other => CatalogResponse::Error(ServerError {
            kind: ServerErrorKind::Internal,
            message: format!("unhandled request {other:?}"),
        }),
    }
}
