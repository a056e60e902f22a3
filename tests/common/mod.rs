// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use rmirror::error::MirrorError;
use rmirror::rawhttp::build_response_bytes;
use rmirror::transport::{ServiceDescriptor, Transport};

pub fn build_request(method: &str, path: &str, host: &str, extra_headers: &[&str]) -> Vec<u8> {
    let mut raw = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", method, path, host);
    for header in extra_headers {
        raw.push_str(header);
        raw.push_str("\r\n");
    }
    raw.push_str("\r\n");
    raw.into_bytes()
}

pub fn build_response(status: u16, headers: &[(&str, &str)], body: &str) -> Vec<u8> {
    let owned: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    build_response_bytes(status, "OK", &owned, body)
}

/// Scripted in-memory transport: canned response bytes per host, optional
/// per-host latency, and a record of every request it saw.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<(String, Vec<u8>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, host: &str, status: u16, body: &str) {
        self.respond_raw(host, build_response(status, &[], body));
    }

    pub fn respond_with_headers(&self, host: &str, status: u16, headers: &[(&str, &str)], body: &str) {
        self.respond_raw(host, build_response(status, headers, body));
    }

    pub fn respond_raw(&self, host: &str, bytes: Vec<u8>) {
        self.responses.lock().insert(host.to_string(), bytes);
    }

    pub fn delay(&self, host: &str, delay: Duration) {
        self.delays.lock().insert(host.to_string(), delay);
    }

    pub fn requests_for(&self, host: &str) -> Vec<Vec<u8>> {
        self.requests
            .lock()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, raw)| raw.clone())
            .collect()
    }

    pub fn call_count(&self, host: &str) -> usize {
        self.requests.lock().iter().filter(|(h, _)| h == host).count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        service: &ServiceDescriptor,
        raw_request: &[u8],
    ) -> Result<Vec<u8>, MirrorError> {
        self.requests
            .lock()
            .push((service.host.clone(), raw_request.to_vec()));

        let delay = self.delays.lock().get(&service.host).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().get(&service.host).cloned();
        response.ok_or_else(|| MirrorError::transport_failure(&service.host, "no scripted response"))
    }
}
