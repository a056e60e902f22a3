// File: registry.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use log::{debug, info};
use parking_lot::Mutex;

use crate::domain::{normalize_domain, DomainConfig, DomainEntry};
use crate::error::MirrorError;

/// The set of tracked domains and their sessions.
///
/// One mutex covers the whole collection: every mutating and iterating
/// operation runs under it, and no caller holds it across network I/O.
/// Callers must not assume the collection is unchanged between two calls.
pub struct DomainRegistry {
    entries: Mutex<Vec<DomainEntry>>,
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Add a tracked domain. The first entry added becomes primary. Fails
    /// with `DuplicateDomain` when the normalized domain is already present.
    pub fn add(&self, raw_domain: &str, config: DomainConfig) -> Result<(), MirrorError> {
        let domain = normalize_domain(raw_domain);
        if domain.is_empty() {
            debug!("Ignoring empty domain input");
            return Ok(());
        }

        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.domain == domain) {
            return Err(MirrorError::DuplicateDomain(domain));
        }

        let is_primary = entries.is_empty();
        let mode = config.auth_mode;
        entries.push(DomainEntry::new(domain.clone(), config, is_primary));
        info!("Added domain: {} [{}]", domain, mode);
        Ok(())
    }

    /// Remove a tracked domain. If it was primary, the first remaining entry
    /// is promoted. Removing an unknown domain is a no-op.
    pub fn remove(&self, domain: &str) {
        let mut entries = self.entries.lock();
        let Some(idx) = entries.iter().position(|e| e.domain == domain) else {
            return;
        };
        let removed = entries.remove(idx);
        info!("Removed domain: {}", removed.domain);
        if removed.is_primary {
            if let Some(first) = entries.first_mut() {
                first.is_primary = true;
                info!("Promoted {} to primary", first.domain);
            }
        }
    }

    /// Make `domain` the primary. Clears the flag on every other entry.
    /// Silently leaves state untouched when the domain is unknown.
    pub fn set_primary(&self, domain: &str) {
        let mut entries = self.entries.lock();
        if !entries.iter().any(|e| e.domain == domain) {
            return;
        }
        for entry in entries.iter_mut() {
            entry.is_primary = entry.domain == domain;
        }
    }

    /// Run `f` on the entry matched by `host`: exact domain match or
    /// subdomain suffix match (`host` ends with `".{domain}"`), first match
    /// in iteration order. Returns `None` when no entry matches.
    pub fn with_host<R>(&self, host: &str, f: impl FnOnce(&mut DomainEntry) -> R) -> Option<R> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| host == e.domain || host.ends_with(&format!(".{}", e.domain)))?;
        debug!("Host {} matched tracked domain {}", host, entry.domain);
        Some(f(entry))
    }

    /// Run `f` on the entry whose domain equals `domain` exactly.
    pub fn with_domain<R>(&self, domain: &str, f: impl FnOnce(&mut DomainEntry) -> R) -> Option<R> {
        let mut entries = self.entries.lock();
        let entry = entries.iter_mut().find(|e| e.domain == domain)?;
        Some(f(entry))
    }

    /// Snapshot of the current primary entry, if any.
    pub fn primary(&self) -> Option<DomainEntry> {
        self.entries.lock().iter().find(|e| e.is_primary).cloned()
    }

    /// Snapshot of all non-primary entries, in registry order.
    pub fn mirrors(&self) -> Vec<DomainEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| !e.is_primary)
            .cloned()
            .collect()
    }

    /// All tracked domain names, in registry order.
    pub fn domains(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.domain.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Reset a domain's captured session back to waiting.
    pub fn clear_session(&self, domain: &str) -> bool {
        self.with_domain(domain, |entry| {
            entry.session.clear();
            entry.session.update_status(entry.auth_mode);
            info!("Cleared session: {}", entry.domain);
        })
        .is_some()
    }
}
