// File: http_transport_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use rmirror::rawhttp::RawResponse;
use rmirror::transport::{HttpTransport, ServiceDescriptor, Transport};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> ServiceDescriptor {
    let uri = server.uri();
    let address = uri.trim_start_matches("http://");
    let (host, port) = address.split_once(':').expect("mock server address");
    ServiceDescriptor::new(host, port.parse().unwrap(), false)
}

#[tokio::test]
async fn test_get_round_trip_preserves_status_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check"))
        .and(header("x-probe", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("hello from mirror")
                .append_header("set-cookie", "sid=77; Path=/"),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let raw = b"GET /check HTTP/1.1\r\nHost: replaced.example\r\nX-Probe: 1\r\n\r\n";
    let bytes = transport.send(&service_for(&server), raw).await.unwrap();

    let response = RawResponse::parse(&bytes);
    assert_eq!(response.status(), 200);
    assert_eq!(response.body, "hello from mirror");
    assert_eq!(response.set_cookie_values(), vec!["sid=77; Path=/"]);
}

#[tokio::test]
async fn test_post_body_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_string("{\"refresh_token\":\"r1\"}"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"access_token\":\"t2\"}"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let raw = b"POST /auth/refresh HTTP/1.1\r\nHost: x\r\nContent-Type: application/json\r\n\r\n{\"refresh_token\":\"r1\"}";
    let bytes = transport.send(&service_for(&server), raw).await.unwrap();

    let response = RawResponse::parse(&bytes);
    assert_eq!(response.status(), 200);
    assert_eq!(response.body, "{\"access_token\":\"t2\"}");
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bounce"))
        .respond_with(
            ResponseTemplate::new(302).append_header("location", "https://elsewhere.example/"),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let raw = b"GET /bounce HTTP/1.1\r\nHost: x\r\n\r\n";
    let bytes = transport.send(&service_for(&server), raw).await.unwrap();

    let response = RawResponse::parse(&bytes);
    assert_eq!(response.status(), 302);
    assert_eq!(
        response.header_value("location"),
        Some("https://elsewhere.example/")
    );
}

#[tokio::test]
async fn test_connection_error_is_a_transport_failure() {
    // nothing listens on this port
    let service = ServiceDescriptor::new("127.0.0.1", 1, false);
    let transport = HttpTransport::new().unwrap();
    let raw = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
    let error = transport.send(&service, raw).await.unwrap_err();
    assert!(error.to_string().contains("transport failure"));
}
