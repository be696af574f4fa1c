//! End-to-end: the throttling transport streaming a body into a local
//! HTTP server through the reqwest executor.

use bytes::Bytes;
use futures_util::stream;
use http::{Request, header};
use slipstream_core::UploadConfig;
use slipstream_transport::{HttpClient, ThrottlingTransport, Transport, UploadBody};
use std::io;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn uploads_body_and_accounts_every_byte() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let payload: Vec<u8> = (0..128 * 1024).map(|i| (i % 251) as u8).collect();
    let chunks: Vec<io::Result<Bytes>> = payload
        .chunks(16 * 1024)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();

    let config = UploadConfig::default();
    let transport = ThrottlingTransport::new(
        HttpClient::new(&config).expect("client"),
        &config,
        payload.len() as u64,
    )
    .expect("transport");

    let request = Request::builder()
        .method(http::Method::PUT)
        .uri(format!("{}/videos", server.uri()))
        .header(header::CONTENT_TYPE, "video/mp4")
        .body(UploadBody::from_stream(Box::pin(stream::iter(chunks))))
        .expect("request");

    let response = transport.execute(request).await.expect("upload");
    assert_eq!(response.status(), 200);
    assert_eq!(response.body().as_ref(), b"ok");

    let snapshot = transport.session().snapshot().expect("stats recorded");
    assert_eq!(snapshot.bytes, payload.len() as u64);

    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].body, payload);
}

#[tokio::test]
async fn metadata_exchange_leaves_the_session_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/metadata"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = UploadConfig::default();
    let transport =
        ThrottlingTransport::new(HttpClient::new(&config).expect("client"), &config, 1_000)
            .expect("transport");

    let request = Request::builder()
        .method(http::Method::POST)
        .uri(format!("{}/metadata", server.uri()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(UploadBody::from(br#"{"title":"clip"}"#.to_vec()))
        .expect("request");

    let response = transport.execute(request).await.expect("exchange");
    assert_eq!(response.status(), 200);
    assert!(transport.session().snapshot().is_none());
}
