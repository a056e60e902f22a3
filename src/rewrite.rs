// File: rewrite.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

//! Request rewriting: take a captured request and re-issue it against a
//! mirror domain with that domain's credential material substituted in.

use log::{debug, warn};

use crate::domain::{AuthMode, DomainEntry};
use crate::rawhttp::RawRequest;

/// Marker header appended to every rewritten request. Self-generated traffic
/// is recognized by a strict whole-line equality check against this literal,
/// never by pattern matching, so mirrored exchanges are excluded from
/// recursive mirroring.
pub const MARKER_HEADER: &str = "X-Rmirror-Internal: true";

/// Whether a raw request was produced by this tool.
pub fn is_self_generated(raw_request: &[u8]) -> bool {
    let request = RawRequest::parse(raw_request);
    request.headers.iter().any(|h| h == MARKER_HEADER)
}

/// Build the mirrored request for `target`: same request line and body, with
/// Host and credential headers rewritten for the target's auth mode.
pub fn build_mirrored_request(original: &[u8], target: &DomainEntry) -> Vec<u8> {
    let request = RawRequest::parse(original);
    let mode = target.auth_mode;
    let session = &target.session;
    let custom_name = target.custom_header_name.trim();
    let custom_prefix = format!("{}:", custom_name.to_lowercase());

    let mut headers: Vec<String> = Vec::with_capacity(request.headers.len() + 3);
    let mut had_auth = false;
    let mut had_cookie = false;

    for header in &request.headers {
        let lower = header.to_lowercase();

        if lower.starts_with("host:") {
            headers.push(format!("Host: {}", target.domain));
        } else if lower.starts_with("authorization:") {
            had_auth = true;
            if mode.bearer_in_scope() && session.has_bearer() {
                headers.push(format!("Authorization: Bearer {}", session.bearer));
            } else if !mode.bearer_in_scope() {
                debug!("Dropping Authorization header for {} ({})", target.domain, mode);
            } else {
                warn!(
                    "No captured bearer for {} - forwarding original Authorization header",
                    target.domain
                );
                headers.push(header.clone());
            }
        } else if lower.starts_with("cookie:") {
            had_cookie = true;
            if mode.cookies_in_scope() && session.has_cookies() {
                headers.push(format!("Cookie: {}", session.cookie_header_value()));
            } else if !mode.cookies_in_scope() {
                debug!("Dropping Cookie header for {} ({})", target.domain, mode);
            } else {
                // Cross-domain leak: the primary's cookies travel to the
                // mirror until the mirror captures its own.
                warn!(
                    "No captured cookies for {} - reusing the original (primary) Cookie header",
                    target.domain
                );
                headers.push(header.clone());
            }
        } else if mode == AuthMode::CustomHeader
            && !custom_name.is_empty()
            && lower.starts_with(&custom_prefix)
        {
            if target.custom_header_value.is_empty() {
                headers.push(header.clone());
            } else {
                headers.push(format!("{}: {}", custom_name, target.custom_header_value));
            }
        } else {
            headers.push(header.clone());
        }
    }

    if mode.bearer_in_scope() && !had_auth && session.has_bearer() {
        headers.push(format!("Authorization: Bearer {}", session.bearer));
    }
    if mode.cookies_in_scope() && !had_cookie && session.has_cookies() {
        headers.push(format!("Cookie: {}", session.cookie_header_value()));
    }
    if mode == AuthMode::CustomHeader && !custom_name.is_empty() && !target.custom_header_value.is_empty()
    {
        let present = headers
            .iter()
            .any(|h| h.to_lowercase().starts_with(&custom_prefix));
        if !present {
            headers.push(format!("{}: {}", custom_name, target.custom_header_value));
        }
    }

    headers.push(MARKER_HEADER.to_string());

    RawRequest {
        request_line: request.request_line,
        headers,
        body: request.body,
        line_sep: request.line_sep,
    }
    .to_bytes()
}
