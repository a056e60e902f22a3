// File: capture.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

//! Session capture: feeds observed request/response pairs into a domain's
//! session. All functions operate on one entry under the registry lock and
//! never touch other components' state.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use log::{debug, info};
use serde_json::Value;

use crate::config::MirrorConfig;
use crate::domain::{DomainEntry, Session};
use crate::rawhttp::{RawRequest, RawResponse};

/// What a response-leg capture pass observed, for the layer above to act on.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureReport {
    pub session_changed: bool,
    /// The originating request path matched a refresh pattern. The engine
    /// uses this (together with the entry's primary flag and the
    /// auto-refresh setting) to fan refreshes out to the mirrors.
    pub is_refresh_response: bool,
}

/// Scan request headers for credential material in scope for the entry's
/// auth mode. Returns whether the session changed.
pub fn capture_from_request(entry: &mut DomainEntry, raw_request: &[u8], _config: &MirrorConfig) -> bool {
    if entry.auth_mode == crate::domain::AuthMode::None {
        return false;
    }
    if raw_request.is_empty() {
        return false;
    }

    let request = RawRequest::parse(raw_request);
    let mode = entry.auth_mode;
    let session = &mut entry.session;
    let mut updated = false;

    for header in &request.headers {
        let lower = header.to_lowercase();
        if lower.starts_with("authorization:") {
            if !mode.bearer_in_scope() {
                continue;
            }
            let value = header.splitn(2, ':').nth(1).unwrap_or("").trim();
            if let Some(token) = strip_bearer(value) {
                if token != session.bearer {
                    session.bearer = token.to_string();
                    session.token_expiry = token_expiry_from_jwt(token);
                    session.touch();
                    updated = true;
                    info!("Captured bearer: {}", entry.domain);
                }
            }
        } else if lower.starts_with("cookie:") {
            if !mode.cookies_in_scope() {
                continue;
            }
            let value = header.splitn(2, ':').nth(1).unwrap_or("").trim();
            if merge_cookie_pairs(session, value) {
                session.touch();
                updated = true;
            }
        }
    }

    if updated {
        entry.session.update_status(mode);
    }
    updated
}

/// Harvest `Set-Cookie` headers and JSON body tokens from a response in
/// scope for the entry's auth mode. Body parse failures are swallowed: the
/// pass simply contributes nothing.
pub fn capture_from_response(
    entry: &mut DomainEntry,
    raw_request: &[u8],
    raw_response: &[u8],
    config: &MirrorConfig,
) -> CaptureReport {
    if entry.auth_mode == crate::domain::AuthMode::None || raw_response.is_empty() {
        return CaptureReport::default();
    }

    let request_path = if raw_request.is_empty() {
        String::new()
    } else {
        RawRequest::parse(raw_request).path().to_string()
    };
    let is_refresh = !request_path.is_empty() && config.is_refresh_path(&request_path);
    if !request_path.is_empty() && config.is_login_path(&request_path) {
        debug!("Login endpoint response observed for {}", entry.domain);
    }

    let response = RawResponse::parse(raw_response);
    let mode = entry.auth_mode;
    let mut updated = false;

    if mode.cookies_in_scope() {
        for cookie in response.set_cookie_values() {
            let pair = cookie.split(';').next().unwrap_or("").trim();
            if let Some((name, value)) = pair.split_once('=') {
                entry
                    .session
                    .cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
                entry.session.touch();
                updated = true;
            }
        }
    }

    if mode.bearer_in_scope() && response.body.trim_start().starts_with('{') {
        if extract_tokens_from_json(&mut entry.session, &response.body, config, &entry.domain) {
            updated = true;
        }
    }

    if updated {
        entry.session.update_status(mode);
    }

    CaptureReport {
        session_changed: updated,
        is_refresh_response: is_refresh,
    }
}

fn strip_bearer(value: &str) -> Option<&str> {
    if value.len() >= 7 && value[..7].eq_ignore_ascii_case("bearer ") {
        Some(value[7..].trim())
    } else {
        None
    }
}

fn merge_cookie_pairs(session: &mut Session, cookie_header: &str) -> bool {
    let mut changed = false;
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            let name = name.trim();
            let value = value.trim();
            if session.cookies.get(name).map(|v| v.as_str()) != Some(value) {
                session.cookies.insert(name.to_string(), value.to_string());
                changed = true;
            }
        }
    }
    changed
}

/// Search a JSON body for access/refresh tokens using the configured key
/// lists; each key is checked at the top level and then under nested `data`
/// and `result` objects, first hit winning.
fn extract_tokens_from_json(
    session: &mut Session,
    body: &str,
    config: &MirrorConfig,
    domain: &str,
) -> bool {
    let Ok(data) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    let mut updated = false;

    if let Some(token) = find_json_value(&data, config.token_keys()) {
        if token != session.bearer {
            session.token_expiry = token_expiry_from_jwt(&token);
            session.bearer = token;
            session.touch();
            updated = true;
            info!("Captured token from response: {}", domain);
        }
    }

    if let Some(refresh) = find_json_value(&data, config.refresh_token_keys()) {
        if refresh != session.refresh_token {
            session.refresh_token = refresh;
            session.touch();
            updated = true;
        }
    }

    updated
}

fn find_json_value(data: &Value, keys: &[String]) -> Option<String> {
    for key in keys {
        if let Some(value) = data.get(key).and_then(Value::as_str) {
            return Some(value.to_string());
        }
        for nested in ["data", "result"] {
            if let Some(value) = data
                .get(nested)
                .filter(|v| v.is_object())
                .and_then(|v| v.get(key))
                .and_then(Value::as_str)
            {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Decode the `exp` claim from a JWT-shaped token. The middle dot-separated
/// segment is base64-decoded after restoring padding and parsed as JSON; any
/// failure leaves the expiry unset without failing the capture.
pub fn token_expiry_from_jwt(token: &str) -> Option<i64> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let mut payload = parts[1].to_string();
    let rem = payload.len() % 4;
    if rem != 0 {
        payload.push_str(&"=".repeat(4 - rem));
    }

    let decoded = URL_SAFE
        .decode(payload.as_bytes())
        .or_else(|_| STANDARD.decode(payload.as_bytes()))
        .ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.get("exp")?;
    exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))
}
