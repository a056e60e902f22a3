// File: dispatch.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

//! Mirror fan-out: for one observed primary exchange, build a rewritten
//! request per mirror, send them under a bounded permit pool with per-call
//! timeouts, and assemble the comparison record.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::capture;
use crate::config::MirrorConfig;
use crate::domain::DomainEntry;
use crate::error::MirrorError;
use crate::rawhttp::{RawRequest, RawResponse};
use crate::registry::DomainRegistry;
use crate::results::{MirrorResult, ResponseRecord, ResultStore};
use crate::rewrite::build_mirrored_request;
use crate::transport::{ServiceDescriptor, Transport};

const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// SHA-256 hex digest of a response body; the equality verdict between
/// domains is a comparison of these.
pub fn hash_body(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct MirrorDispatcher {
    registry: Arc<DomainRegistry>,
    store: Arc<ResultStore>,
    transport: Arc<dyn Transport>,
    permits: RwLock<Arc<Semaphore>>,
}

impl MirrorDispatcher {
    pub fn new(
        registry: Arc<DomainRegistry>,
        store: Arc<ResultStore>,
        transport: Arc<dyn Transport>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            registry,
            store,
            transport,
            permits: RwLock::new(Arc::new(Semaphore::new(max_concurrent.max(1)))),
        }
    }

    /// Swap in a fresh permit pool. In-flight sends keep permits from the
    /// old pool until they complete, so accounting still converges.
    pub fn set_max_concurrent(&self, max_concurrent: usize) {
        *self.permits.write() = Arc::new(Semaphore::new(max_concurrent.max(1)));
    }

    /// Fan one primary exchange out to every mirror and publish the
    /// assembled result. Refresh traffic is never mirrored - re-running a
    /// refresh against the mirrors would desynchronize their tokens.
    pub async fn on_primary_exchange(
        &self,
        raw_request: &[u8],
        raw_response: &[u8],
        primary_host: &str,
        https: bool,
        port: u16,
        config: &MirrorConfig,
    ) {
        let request = RawRequest::parse(raw_request);
        let method = request.method().to_string();
        let path = request.path().to_string();

        if config.is_refresh_path(&path) {
            debug!("Not mirroring refresh endpoint {}", path);
            return;
        }

        let mirrors = self.registry.mirrors();
        if mirrors.is_empty() {
            warn!("No mirror domains configured");
            return;
        }

        let response = RawResponse::parse(raw_response);
        let primary_record = ResponseRecord {
            domain: primary_host.to_string(),
            status: response.status(),
            size: response.body.len(),
            hash: hash_body(&response.body),
            body: response.body,
        };

        info!(
            ">>> Mirroring {} {} from {}:{} to {} mirror(s)",
            method,
            path,
            primary_host,
            port,
            mirrors.len()
        );

        let timeout_secs = config.request_timeout_secs();
        let shared_request: Arc<Vec<u8>> = Arc::new(raw_request.to_vec());
        let shared_config = Arc::new(config.clone());
        let permits = self.permits.read().clone();

        let mut tasks = FuturesUnordered::new();
        for (idx, mirror) in mirrors.into_iter().enumerate() {
            if !mirror.session.has_cookies() && !mirror.session.has_bearer() {
                warn!(
                    "{} has no captured session - mirrored request may bounce",
                    mirror.domain
                );
            }

            let permit = match permits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(
                        "{}",
                        MirrorError::ConcurrencyExhausted {
                            domain: mirror.domain.clone()
                        }
                    );
                    continue;
                }
            };

            let registry = Arc::clone(&self.registry);
            let transport = Arc::clone(&self.transport);
            let raw = Arc::clone(&shared_request);
            let config = Arc::clone(&shared_config);
            tasks.push(tokio::spawn(async move {
                let record =
                    mirror_one(registry, transport, raw, mirror, https, timeout_secs, config, permit)
                        .await;
                (idx, record)
            }));
        }

        let mut collected: Vec<(usize, ResponseRecord)> = Vec::new();
        while let Some(joined) = tasks.next().await {
            if let Ok((idx, Some(record))) = joined {
                collected.push((idx, record));
            }
        }
        collected.sort_by_key(|(idx, _)| *idx);

        let mut responses = vec![primary_record];
        responses.extend(collected.into_iter().map(|(_, record)| record));

        let distinct: HashSet<&str> = responses.iter().map(|r| r.hash.as_str()).collect();
        let matched = distinct.len() == 1;

        let short_path: String = path.chars().take(50).collect();
        info!(
            "Result: {} {} {}",
            if matched { "MATCH" } else { "DIFF" },
            method,
            short_path
        );

        self.store.push(MirrorResult {
            method,
            path,
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            matched,
            responses,
        });
    }
}

#[allow(clippy::too_many_arguments)]
async fn mirror_one(
    registry: Arc<DomainRegistry>,
    transport: Arc<dyn Transport>,
    raw_request: Arc<Vec<u8>>,
    mirror: DomainEntry,
    https: bool,
    timeout_secs: u64,
    config: Arc<MirrorConfig>,
    permit: OwnedSemaphorePermit,
) -> Option<ResponseRecord> {
    let domain = mirror.domain.clone();
    let built = build_mirrored_request(&raw_request, &mirror);
    let service = ServiceDescriptor::for_scheme(domain.clone(), https);
    debug!("Sending mirrored request to {}:{}", service.host, service.port);

    // The permit lives inside the send task: if the wait below gives up, the
    // underlying send keeps running detached and the permit is still
    // released exactly once, when that send finishes.
    let send_request = built.clone();
    let send_handle = tokio::spawn(async move {
        let _permit = permit;
        transport.send(&service, &send_request).await
    });

    let raw_response = match tokio::time::timeout(Duration::from_secs(timeout_secs), send_handle).await
    {
        Err(_) => {
            warn!(
                "{}",
                MirrorError::TransportTimeout {
                    domain,
                    seconds: timeout_secs
                }
            );
            return None;
        }
        Ok(Err(join_error)) => {
            warn!("Mirror task for {} aborted: {}", domain, join_error);
            return None;
        }
        Ok(Ok(Err(error))) => {
            warn!("{}", error);
            return None;
        }
        Ok(Ok(Ok(bytes))) => bytes,
    };

    if raw_response.is_empty() {
        warn!("{}", MirrorError::malformed_response(&domain, "empty response"));
        return None;
    }

    let parsed = RawResponse::parse(&raw_response);
    let status = parsed.status();
    if REDIRECT_STATUSES.contains(&status) {
        warn!("Mirrored to {}: {} (redirect - session issue?)", domain, status);
    } else {
        info!("Mirrored to {}: {}", domain, status);
    }

    // Mirrors bootstrap and refresh their own sessions from their own
    // responses.
    registry.with_domain(&domain, |entry| {
        capture::capture_from_response(entry, &built, &raw_response, &config);
    });

    Some(ResponseRecord {
        domain,
        status,
        size: parsed.body.len(),
        hash: hash_body(&parsed.body),
        body: parsed.body,
    })
}
