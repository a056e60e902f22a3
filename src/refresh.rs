// File: refresh.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

//! Token refresh: actively exercises a domain's refresh endpoint with its
//! current credentials and feeds the response back through session capture.
//! Concurrent refresh attempts per domain are deduplicated through an
//! in-flight set, not a counter.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::capture;
use crate::config::MirrorConfig;
use crate::rawhttp::RawRequest;
use crate::registry::DomainRegistry;
use crate::transport::{ServiceDescriptor, Transport};

pub struct RefreshScheduler {
    registry: Arc<DomainRegistry>,
    transport: Arc<dyn Transport>,
    in_flight: Mutex<HashSet<String>>,
}

impl RefreshScheduler {
    pub fn new(registry: Arc<DomainRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Refresh one domain's session. Returns immediately when a refresh for
    /// the domain is already in flight. Failures are logged, never raised;
    /// the in-flight marker is always cleared.
    pub async fn trigger(&self, domain: &str, config: &MirrorConfig) {
        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(domain.to_string()) {
                debug!("Refresh already in flight for {}", domain);
                return;
            }
        }

        self.do_refresh(domain, config).await;

        self.in_flight.lock().remove(domain);
    }

    /// Trigger a refresh for every tracked domain.
    pub async fn refresh_all(&self, config: &MirrorConfig) {
        for domain in self.registry.domains() {
            self.trigger(&domain, config).await;
        }
    }

    async fn do_refresh(&self, domain: &str, config: &MirrorConfig) {
        let Some(entry) = self
            .registry
            .with_domain(domain, |entry| entry.clone())
        else {
            debug!("Refresh skipped, unknown domain: {}", domain);
            return;
        };

        let session = &entry.session;
        if session.refresh_token.is_empty() && !session.has_cookies() {
            debug!("Refresh skipped for {}: no refresh token or cookies", domain);
            return;
        }

        let path = config.refresh_request_path().to_string();
        let mut headers = vec![
            format!("Host: {}", domain),
            "Content-Type: application/json".to_string(),
        ];
        if entry.auth_mode.cookies_in_scope() && session.has_cookies() {
            headers.push(format!("Cookie: {}", session.cookie_header_value()));
        }
        if entry.auth_mode.bearer_in_scope() && session.has_bearer() {
            headers.push(format!("Authorization: Bearer {}", session.bearer));
        }

        let body = if session.refresh_token.is_empty() {
            "{}".to_string()
        } else {
            serde_json::json!({ "refresh_token": session.refresh_token }).to_string()
        };

        let request = RawRequest {
            request_line: format!("POST {} HTTP/1.1", path),
            headers,
            body,
            line_sep: "\r\n",
        }
        .to_bytes();

        let service = ServiceDescriptor::new(domain.to_string(), 443, true);
        let outcome = tokio::time::timeout(
            Duration::from_secs(config.request_timeout_secs()),
            self.transport.send(&service, &request),
        )
        .await;

        match outcome {
            Err(_) => {
                warn!(
                    "Refresh timed out for {} after {}s",
                    domain,
                    config.request_timeout_secs()
                );
            }
            Ok(Err(error)) => {
                warn!("Refresh error for {}: {}", domain, error);
            }
            Ok(Ok(response)) if response.is_empty() => {
                warn!("Refresh for {} returned an empty response", domain);
            }
            Ok(Ok(response)) => {
                self.registry.with_domain(domain, |entry| {
                    capture::capture_from_response(entry, &request, &response, config);
                });
                info!("Refreshed: {}", domain);
            }
        }
    }
}
