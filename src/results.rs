// File: results.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One domain's response within a mirrored exchange. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub domain: String,
    pub status: u16,
    pub size: usize,
    pub hash: String,
    pub body: String,
}

/// The outcome of mirroring one primary exchange to every configured mirror.
/// `responses` keeps insertion order: the primary first, then mirrors in
/// registry order; mirrors that failed or timed out are simply absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorResult {
    pub method: String,
    pub path: String,
    pub timestamp: String,
    #[serde(rename = "match")]
    pub matched: bool,
    pub responses: Vec<ResponseRecord>,
}

impl MirrorResult {
    pub fn response_for(&self, domain: &str) -> Option<&ResponseRecord> {
        self.responses.iter().find(|r| r.domain == domain)
    }

    pub fn domains(&self) -> Vec<&str> {
        self.responses.iter().map(|r| r.domain.as_str()).collect()
    }

    /// The primary's record is always the first inserted.
    pub fn primary_response(&self) -> Option<&ResponseRecord> {
        self.responses.first()
    }
}

/// Snapshot filter for readers and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFilter {
    All,
    MismatchesOnly,
    MatchesOnly,
}

impl ResultFilter {
    fn keep(self, result: &MirrorResult) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::MismatchesOnly => !result.matched,
            ResultFilter::MatchesOnly => result.matched,
        }
    }
}

struct StoreInner {
    results: std::collections::VecDeque<MirrorResult>,
    capacity: usize,
}

/// Bounded, insertion-ordered collection of comparison records. When full,
/// inserting evicts the oldest entry so the store always holds the most
/// recent N results. Results are only pushed once complete, so readers never
/// observe a partially-filled response map.
pub struct ResultStore {
    inner: Mutex<StoreInner>,
}

impl ResultStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                results: std::collections::VecDeque::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn push(&self, result: MirrorResult) {
        let mut inner = self.inner.lock();
        while inner.results.len() >= inner.capacity {
            if inner.results.pop_front().is_some() {
                info!("Result store full - evicted oldest result");
            }
        }
        inner.results.push_back(result);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().results.is_empty()
    }

    pub fn mismatch_count(&self) -> usize {
        self.inner
            .lock()
            .results
            .iter()
            .filter(|r| !r.matched)
            .count()
    }

    pub fn snapshot(&self) -> Vec<MirrorResult> {
        self.inner.lock().results.iter().cloned().collect()
    }

    pub fn snapshot_filtered(&self, filter: ResultFilter) -> Vec<MirrorResult> {
        self.inner
            .lock()
            .results
            .iter()
            .filter(|r| filter.keep(r))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.inner.lock().results.clear();
    }

    /// Shrink or grow the bound; shrinking evicts oldest-first immediately.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock();
        inner.capacity = capacity.max(1);
        while inner.results.len() > inner.capacity {
            inner.results.pop_front();
        }
    }
}
