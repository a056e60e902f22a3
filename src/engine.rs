// File: engine.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

//! Traffic intake and component wiring: observed request/response legs come
//! in from the capture host, session capture and mirror dispatch go out.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;

use crate::capture::{self, CaptureReport};
use crate::config::MirrorConfig;
use crate::dispatch::MirrorDispatcher;
use crate::refresh::RefreshScheduler;
use crate::registry::DomainRegistry;
use crate::results::ResultStore;
use crate::rewrite::is_self_generated;
use crate::transport::Transport;

/// Which capture-host tool produced an observed message. Only tools in the
/// engine's trigger set cause mirroring; capture happens for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficTool {
    Proxy,
    Repeater,
    Scanner,
    Intruder,
    Extension,
    Other,
}

impl TrafficTool {
    pub fn label(self) -> &'static str {
        match self {
            TrafficTool::Proxy => "Proxy",
            TrafficTool::Repeater => "Repeater",
            TrafficTool::Scanner => "Scanner",
            TrafficTool::Intruder => "Intruder",
            TrafficTool::Extension => "Extension",
            TrafficTool::Other => "Other",
        }
    }
}

impl fmt::Display for TrafficTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TrafficTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "proxy" => Ok(TrafficTool::Proxy),
            "repeater" => Ok(TrafficTool::Repeater),
            "scanner" => Ok(TrafficTool::Scanner),
            "intruder" => Ok(TrafficTool::Intruder),
            "extension" | "extender" => Ok(TrafficTool::Extension),
            "other" => Ok(TrafficTool::Other),
            other => Err(format!("unknown traffic tool: {}", other)),
        }
    }
}

/// Owns the registry, result store, dispatcher and refresher, and routes
/// observed traffic between them. The registry and store are the only state
/// shared across units of concurrency, each behind its own lock, and neither
/// lock is held across network I/O.
pub struct MirrorEngine {
    registry: Arc<DomainRegistry>,
    store: Arc<ResultStore>,
    refresher: Arc<RefreshScheduler>,
    dispatcher: MirrorDispatcher,
    config: RwLock<MirrorConfig>,
    triggers: RwLock<HashSet<TrafficTool>>,
}

impl MirrorEngine {
    pub fn new(config: MirrorConfig, transport: Arc<dyn Transport>) -> Arc<Self> {
        let registry = Arc::new(DomainRegistry::new());
        let store = Arc::new(ResultStore::new(config.max_results()));
        let refresher = Arc::new(RefreshScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&transport),
        ));
        let dispatcher = MirrorDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            transport,
            config.max_concurrent_mirrors(),
        );

        let mut triggers = HashSet::new();
        triggers.insert(TrafficTool::Proxy);

        Arc::new(Self {
            registry,
            store,
            refresher,
            dispatcher,
            config: RwLock::new(config),
            triggers: RwLock::new(triggers),
        })
    }

    pub fn registry(&self) -> &Arc<DomainRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    pub fn refresher(&self) -> &Arc<RefreshScheduler> {
        &self.refresher
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> MirrorConfig {
        self.config.read().clone()
    }

    /// Apply a configuration change and resize the store and permit pool to
    /// the (clamped) values that result.
    pub fn update_config(&self, apply: impl FnOnce(&mut MirrorConfig)) {
        let mut config = self.config.write();
        apply(&mut config);
        self.store.set_capacity(config.max_results());
        self.dispatcher.set_max_concurrent(config.max_concurrent_mirrors());
    }

    pub fn set_tool_trigger(&self, tool: TrafficTool, enabled: bool) {
        let mut triggers = self.triggers.write();
        if enabled {
            triggers.insert(tool);
        } else {
            triggers.remove(&tool);
        }
    }

    pub fn is_tool_trigger(&self, tool: TrafficTool) -> bool {
        self.triggers.read().contains(&tool)
    }

    /// Request leg of an observed exchange: session capture only.
    pub async fn on_request(&self, host: &str, _tool: TrafficTool, raw_request: &[u8]) {
        let config = self.config();
        if !config.capture_enabled() {
            return;
        }
        if is_self_generated(raw_request) {
            debug!("Skipping self-generated request for {}", host);
            return;
        }
        self.registry.with_host(host, |entry| {
            capture::capture_from_request(entry, raw_request, &config);
        });
    }

    /// Response leg of an observed exchange: session capture, refresh
    /// propagation, and - for a primary response from a trigger tool when
    /// mirroring is enabled - mirror dispatch.
    pub async fn on_response(
        self: &Arc<Self>,
        host: &str,
        tool: TrafficTool,
        https: bool,
        port: u16,
        raw_request: &[u8],
        raw_response: &[u8],
    ) {
        let config = self.config();
        if is_self_generated(raw_request) {
            debug!("Skipping self-generated exchange for {}", host);
            return;
        }

        let Some((report, is_primary)) = self.registry.with_host(host, |entry| {
            let report = if config.capture_enabled() {
                capture::capture_from_response(entry, raw_request, raw_response, &config)
            } else {
                CaptureReport::default()
            };
            (report, entry.is_primary)
        }) else {
            return;
        };

        if report.is_refresh_response && is_primary && config.auto_refresh_mirrors() {
            info!("Primary refreshed - updating mirrors...");
            for mirror in self.registry.mirrors() {
                let engine = Arc::clone(self);
                tokio::spawn(async move {
                    let config = engine.config();
                    engine.refresher.trigger(&mirror.domain, &config).await;
                });
            }
        }

        if config.mirror_enabled() && is_primary && self.is_tool_trigger(tool) {
            self.dispatcher
                .on_primary_exchange(raw_request, raw_response, host, https, port, &config)
                .await;
        }
    }
}
