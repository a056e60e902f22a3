// File: config.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

/// Runtime configuration for the mirroring core.
///
/// Numeric setters clamp silently into their documented ranges instead of
/// failing, so a bad operator value degrades to the nearest legal one.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    login_patterns: Vec<String>,
    refresh_patterns: Vec<String>,
    token_keys: Vec<String>,
    refresh_token_keys: Vec<String>,
    max_results: usize,
    max_concurrent_mirrors: usize,
    request_timeout_secs: u64,
    max_diff_lines: usize,
    capture_enabled: bool,
    mirror_enabled: bool,
    auto_refresh_mirrors: bool,
}

pub const MAX_RESULTS_RANGE: (usize, usize) = (10, 100_000);
pub const CONCURRENCY_RANGE: (usize, usize) = (1, 50);
pub const TIMEOUT_RANGE: (u64, u64) = (1, 120);
pub const DIFF_LINES_RANGE: (usize, usize) = (50, 10_000);

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorConfig {
    pub fn new() -> Self {
        Self {
            login_patterns: owned(&[
                "/login",
                "/signin",
                "/auth",
                "/authenticate",
                "/oauth",
                "/token",
                "/session",
                "/api/login",
                "/api/auth",
                "/api/token",
            ]),
            refresh_patterns: owned(&["/refresh", "/token/refresh", "/auth/refresh"]),
            token_keys: owned(&[
                "access_token",
                "accessToken",
                "token",
                "id_token",
                "jwt",
                "bearer",
            ]),
            refresh_token_keys: owned(&["refresh_token", "refreshToken"]),
            max_results: 1000,
            max_concurrent_mirrors: 10,
            request_timeout_secs: 15,
            max_diff_lines: 500,
            capture_enabled: true,
            mirror_enabled: false,
            auto_refresh_mirrors: true,
        }
    }

    pub fn login_patterns(&self) -> &[String] {
        &self.login_patterns
    }

    pub fn set_login_patterns(&mut self, patterns: Vec<String>) {
        self.login_patterns = patterns;
    }

    pub fn refresh_patterns(&self) -> &[String] {
        &self.refresh_patterns
    }

    pub fn set_refresh_patterns(&mut self, patterns: Vec<String>) {
        self.refresh_patterns = patterns;
    }

    pub fn token_keys(&self) -> &[String] {
        &self.token_keys
    }

    pub fn set_token_keys(&mut self, keys: Vec<String>) {
        self.token_keys = keys;
    }

    pub fn refresh_token_keys(&self) -> &[String] {
        &self.refresh_token_keys
    }

    pub fn set_refresh_token_keys(&mut self, keys: Vec<String>) {
        self.refresh_token_keys = keys;
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn set_max_results(&mut self, max_results: usize) {
        self.max_results = max_results.clamp(MAX_RESULTS_RANGE.0, MAX_RESULTS_RANGE.1);
    }

    pub fn max_concurrent_mirrors(&self) -> usize {
        self.max_concurrent_mirrors
    }

    pub fn set_max_concurrent_mirrors(&mut self, max: usize) {
        self.max_concurrent_mirrors = max.clamp(CONCURRENCY_RANGE.0, CONCURRENCY_RANGE.1);
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }

    pub fn set_request_timeout_secs(&mut self, timeout: u64) {
        self.request_timeout_secs = timeout.clamp(TIMEOUT_RANGE.0, TIMEOUT_RANGE.1);
    }

    pub fn max_diff_lines(&self) -> usize {
        self.max_diff_lines
    }

    pub fn set_max_diff_lines(&mut self, lines: usize) {
        self.max_diff_lines = lines.clamp(DIFF_LINES_RANGE.0, DIFF_LINES_RANGE.1);
    }

    pub fn capture_enabled(&self) -> bool {
        self.capture_enabled
    }

    pub fn set_capture_enabled(&mut self, enabled: bool) {
        self.capture_enabled = enabled;
    }

    pub fn mirror_enabled(&self) -> bool {
        self.mirror_enabled
    }

    pub fn set_mirror_enabled(&mut self, enabled: bool) {
        self.mirror_enabled = enabled;
    }

    pub fn auto_refresh_mirrors(&self) -> bool {
        self.auto_refresh_mirrors
    }

    pub fn set_auto_refresh_mirrors(&mut self, enabled: bool) {
        self.auto_refresh_mirrors = enabled;
    }

    /// Ordered case-insensitive substring match, the rule every pattern list
    /// in the configuration uses.
    pub fn is_refresh_path(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.refresh_patterns
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()))
    }

    pub fn is_login_path(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.login_patterns
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()))
    }

    /// The first refresh pattern doubles as the request path when actively
    /// exercising a refresh endpoint.
    pub fn refresh_request_path(&self) -> &str {
        self.refresh_patterns
            .first()
            .map(|s| s.as_str())
            .unwrap_or("/auth/refresh")
    }
}
