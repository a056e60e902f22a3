// File: transport.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

//! The transport collaborator: takes raw request bytes and a service
//! descriptor, performs the network send, and hands back raw response bytes.
//! The mirroring core never sees the HTTP client behind this seam.

use async_trait::async_trait;
use log::debug;

use crate::error::MirrorError;
use crate::rawhttp::{build_response_bytes, RawRequest};

/// Where to send a built request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub host: String,
    pub port: u16,
    pub https: bool,
}

impl ServiceDescriptor {
    pub fn new(host: impl Into<String>, port: u16, https: bool) -> Self {
        Self {
            host: host.into(),
            port,
            https,
        }
    }

    /// Conventional descriptor for a domain given the originating scheme.
    pub fn for_scheme(host: impl Into<String>, https: bool) -> Self {
        Self::new(host, if https { 443 } else { 80 }, https)
    }

    pub fn url_for_path(&self, path: &str) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, path)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw request bytes to the service, returning raw response bytes.
    /// The per-call deadline is owned by the caller, not the transport.
    async fn send(
        &self,
        service: &ServiceDescriptor,
        raw_request: &[u8],
    ) -> Result<Vec<u8>, MirrorError>;
}

/// Production transport backed by reqwest. Redirects are disabled so a
/// mirror answering 30x stays observable instead of being followed.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, MirrorError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| MirrorError::transport_failure("client", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        service: &ServiceDescriptor,
        raw_request: &[u8],
    ) -> Result<Vec<u8>, MirrorError> {
        let request = RawRequest::parse(raw_request);
        let method = reqwest::Method::from_bytes(request.method().as_bytes())
            .map_err(|e| MirrorError::transport_failure(&service.host, e))?;
        let url = service.url_for_path(request.path());
        debug!("Transport send: {} {}", request.method(), url);

        let mut builder = self.client.request(method, &url);
        for header in &request.headers {
            let Some((name, value)) = header.split_once(':') else {
                continue;
            };
            let name = name.trim();
            // The client owns these; forwarding them breaks the send.
            if name.eq_ignore_ascii_case("host")
                || name.eq_ignore_ascii_case("content-length")
                || name.eq_ignore_ascii_case("connection")
            {
                continue;
            }
            builder = builder.header(name, value.trim());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MirrorError::transport_failure(&service.host, e))?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).to_string(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| MirrorError::malformed_response(&service.host, e))?;

        Ok(build_response_bytes(
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            &headers,
            &body,
        ))
    }
}
