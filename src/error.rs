// File: error.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use thiserror::Error;

/// Failure taxonomy for the mirroring core.
///
/// A host-lookup miss is not represented here: registry lookups return
/// `Option` because an untracked host is a normal negative result.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("domain already exists: {0}")]
    DuplicateDomain(String),

    #[error("mirror request to {domain} timed out after {seconds}s")]
    TransportTimeout { domain: String, seconds: u64 },

    #[error("transport failure for {domain}: {reason}")]
    TransportFailure { domain: String, reason: String },

    #[error("malformed response from {domain}: {reason}")]
    MalformedResponse { domain: String, reason: String },

    #[error("mirror pool exhausted, {domain} skipped")]
    ConcurrencyExhausted { domain: String },
}

impl MirrorError {
    pub fn transport_failure(domain: &str, reason: impl ToString) -> Self {
        Self::TransportFailure {
            domain: domain.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed_response(domain: &str, reason: impl ToString) -> Self {
        Self::MalformedResponse {
            domain: domain.to_string(),
            reason: reason.to_string(),
        }
    }
}
