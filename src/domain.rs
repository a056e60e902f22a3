// File: domain.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Per-domain policy governing which credential material is captured from
/// observed traffic and substituted into mirrored requests. Fixed at
/// creation/edit time, never inferred from traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMode {
    Auto,
    CookiesOnly,
    BearerOnly,
    Both,
    None,
    CustomHeader,
}

impl AuthMode {
    /// Whether bearer tokens are captured/substituted under this mode.
    /// Capture, rewrite and refresh all consult this one predicate so mode
    /// semantics cannot drift between components.
    pub fn bearer_in_scope(self) -> bool {
        matches!(self, AuthMode::Auto | AuthMode::BearerOnly | AuthMode::Both)
    }

    /// Whether cookies are captured/substituted under this mode.
    pub fn cookies_in_scope(self) -> bool {
        matches!(self, AuthMode::Auto | AuthMode::CookiesOnly | AuthMode::Both)
    }

    pub fn label(self) -> &'static str {
        match self {
            AuthMode::Auto => "Auto Detect",
            AuthMode::CookiesOnly => "Cookies Only",
            AuthMode::BearerOnly => "Bearer Only",
            AuthMode::Both => "Cookies + Bearer",
            AuthMode::None => "None",
            AuthMode::CustomHeader => "Custom Header",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(AuthMode::Auto),
            "cookies" => Ok(AuthMode::CookiesOnly),
            "bearer" => Ok(AuthMode::BearerOnly),
            "both" => Ok(AuthMode::Both),
            "none" => Ok(AuthMode::None),
            "custom" => Ok(AuthMode::CustomHeader),
            other => Err(format!("unknown auth mode: {}", other)),
        }
    }
}

/// Derived readiness of a captured session. Never stored independently of the
/// session contents it is computed from; see [`Session::update_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Waiting,
    Capturing,
    Ready,
}

impl SessionStatus {
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Capturing => "capturing",
            SessionStatus::Ready => "ready",
        }
    }
}

/// Captured authentication state for one domain. Owned exclusively by its
/// [`DomainEntry`] and only mutated under the registry lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub cookies: BTreeMap<String, String>,
    pub bearer: String,
    pub refresh_token: String,
    pub token_expiry: Option<i64>,
    pub last_updated: Option<i64>,
    pub status: SessionStatus,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            cookies: BTreeMap::new(),
            bearer: String::new(),
            refresh_token: String::new(),
            token_expiry: None,
            last_updated: None,
            status: SessionStatus::Waiting,
        }
    }

    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }

    pub fn has_bearer(&self) -> bool {
        !self.bearer.is_empty()
    }

    /// Serialize the cookie map into a single `Cookie:` header value.
    pub fn cookie_header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Full reset back to the waiting state.
    pub fn clear(&mut self) {
        *self = Session::new();
    }

    pub fn touch(&mut self) {
        self.last_updated = Some(chrono::Utc::now().timestamp());
    }

    /// Recompute the derived status from current contents and auth mode.
    /// Called whenever the session is mutated.
    pub fn update_status(&mut self, mode: AuthMode) {
        let cookies = self.has_cookies();
        let bearer = self.has_bearer();

        self.status = match mode {
            AuthMode::Auto => {
                if bearer || cookies {
                    SessionStatus::Ready
                } else {
                    SessionStatus::Waiting
                }
            }
            AuthMode::CookiesOnly => {
                if cookies {
                    SessionStatus::Ready
                } else if bearer {
                    SessionStatus::Capturing
                } else {
                    SessionStatus::Waiting
                }
            }
            AuthMode::BearerOnly => {
                if bearer {
                    SessionStatus::Ready
                } else if cookies {
                    SessionStatus::Capturing
                } else {
                    SessionStatus::Waiting
                }
            }
            AuthMode::Both => {
                if cookies && bearer {
                    SessionStatus::Ready
                } else if cookies || bearer {
                    SessionStatus::Capturing
                } else {
                    SessionStatus::Waiting
                }
            }
            AuthMode::CustomHeader | AuthMode::None => SessionStatus::Ready,
        };
    }
}

/// One tracked domain with its auth configuration and captured session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEntry {
    pub domain: String,
    pub is_primary: bool,
    pub auth_mode: AuthMode,
    pub custom_header_name: String,
    pub custom_header_value: String,
    pub session: Session,
}

/// Creation-time configuration for [`DomainEntry`].
#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub auth_mode: AuthMode,
    pub custom_header_name: String,
    pub custom_header_value: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            auth_mode: AuthMode::Auto,
            custom_header_name: String::new(),
            custom_header_value: String::new(),
        }
    }
}

impl DomainConfig {
    pub fn with_mode(auth_mode: AuthMode) -> Self {
        Self {
            auth_mode,
            ..Self::default()
        }
    }
}

impl DomainEntry {
    pub fn new(domain: String, config: DomainConfig, is_primary: bool) -> Self {
        let mut session = Session::new();
        session.update_status(config.auth_mode);
        Self {
            domain,
            is_primary,
            auth_mode: config.auth_mode,
            custom_header_name: config.custom_header_name,
            custom_header_value: config.custom_header_value,
            session,
        }
    }

    /// Operator-facing session detail, rendered by the console layer.
    pub fn summary(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("DOMAIN: {}\n", self.domain));
        text.push_str(&format!(
            "  Role: {}\n",
            if self.is_primary { "PRIMARY" } else { "Mirror" }
        ));
        text.push_str(&format!("  Auth Mode: {}\n", self.auth_mode));
        if self.auth_mode == AuthMode::CustomHeader {
            text.push_str(&format!("  Custom Header: {}\n", self.custom_header_name));
        }
        text.push_str(&format!("  Status: {}\n", self.session.status.label()));

        if self.session.has_bearer() {
            text.push_str(&format!("  Access Token: {}\n", truncate(&self.session.bearer, 70)));
        } else {
            text.push_str("  Access Token: (not captured)\n");
        }
        if !self.session.refresh_token.is_empty() {
            text.push_str(&format!(
                "  Refresh Token: {}\n",
                truncate(&self.session.refresh_token, 70)
            ));
        }
        if let Some(expiry) = self.session.token_expiry {
            let remaining = expiry - chrono::Utc::now().timestamp();
            if remaining > 0 {
                text.push_str(&format!("  Token Expiry: {} ({}s remaining)\n", expiry, remaining));
            } else {
                text.push_str(&format!("  Token Expiry: {} (EXPIRED)\n", expiry));
            }
        }
        if self.session.has_cookies() {
            text.push_str(&format!("  Cookies ({}):\n", self.session.cookies.len()));
            for (name, value) in &self.session.cookies {
                text.push_str(&format!("    {} = {}\n", name, truncate(value, 40)));
            }
        } else {
            text.push_str("  Cookies: (none)\n");
        }
        text
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let cut: String = value.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        value.to_string()
    }
}

/// Normalize operator input down to a bare lowercase host: scheme and any
/// path component are stripped.
pub fn normalize_domain(raw: &str) -> String {
    let mut domain = raw.trim().to_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(stripped) = domain.strip_prefix(prefix) {
            domain = stripped.to_string();
        }
    }
    domain.split('/').next().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_predicates() {
        assert!(AuthMode::Auto.bearer_in_scope());
        assert!(AuthMode::Auto.cookies_in_scope());
        assert!(AuthMode::BearerOnly.bearer_in_scope());
        assert!(!AuthMode::BearerOnly.cookies_in_scope());
        assert!(!AuthMode::CookiesOnly.bearer_in_scope());
        assert!(AuthMode::CookiesOnly.cookies_in_scope());
        assert!(AuthMode::Both.bearer_in_scope());
        assert!(AuthMode::Both.cookies_in_scope());
        assert!(!AuthMode::None.bearer_in_scope());
        assert!(!AuthMode::None.cookies_in_scope());
        assert!(!AuthMode::CustomHeader.bearer_in_scope());
        assert!(!AuthMode::CustomHeader.cookies_in_scope());
    }

    #[test]
    fn test_status_table_both_mode() {
        let mut session = Session::new();
        session.update_status(AuthMode::Both);
        assert_eq!(session.status, SessionStatus::Waiting);

        session.bearer = "abc".to_string();
        session.update_status(AuthMode::Both);
        assert_eq!(session.status, SessionStatus::Capturing);

        session.cookies.insert("sid".to_string(), "1".to_string());
        session.update_status(AuthMode::Both);
        assert_eq!(session.status, SessionStatus::Ready);

        session.bearer.clear();
        session.update_status(AuthMode::Both);
        assert_eq!(session.status, SessionStatus::Capturing);
    }

    #[test]
    fn test_status_table_single_credential_modes() {
        let mut session = Session::new();
        session.cookies.insert("sid".to_string(), "1".to_string());

        session.update_status(AuthMode::BearerOnly);
        assert_eq!(session.status, SessionStatus::Capturing);

        session.update_status(AuthMode::CookiesOnly);
        assert_eq!(session.status, SessionStatus::Ready);

        session.update_status(AuthMode::Auto);
        assert_eq!(session.status, SessionStatus::Ready);
    }

    #[test]
    fn test_status_always_ready_modes() {
        let mut session = Session::new();
        session.update_status(AuthMode::None);
        assert_eq!(session.status, SessionStatus::Ready);
        session.update_status(AuthMode::CustomHeader);
        assert_eq!(session.status, SessionStatus::Ready);
    }

    #[test]
    fn test_session_clear_resets_status() {
        let mut session = Session::new();
        session.bearer = "tok".to_string();
        session.refresh_token = "ref".to_string();
        session.token_expiry = Some(123);
        session.update_status(AuthMode::Auto);
        assert_eq!(session.status, SessionStatus::Ready);

        session.clear();
        assert_eq!(session.status, SessionStatus::Waiting);
        assert!(!session.has_bearer());
        assert!(session.refresh_token.is_empty());
        assert!(session.token_expiry.is_none());
    }

    #[test]
    fn test_cookie_header_value_is_deterministic() {
        let mut session = Session::new();
        session.cookies.insert("z".to_string(), "26".to_string());
        session.cookies.insert("a".to_string(), "1".to_string());
        assert_eq!(session.cookie_header_value(), "a=1; z=26");
    }

    #[test]
    fn test_summary_shows_role_and_credentials() {
        let mut entry = DomainEntry::new(
            "b.com".to_string(),
            DomainConfig::with_mode(AuthMode::Both),
            false,
        );
        entry.session.bearer = "tok-123".to_string();
        entry.session.cookies.insert("sid".to_string(), "9".to_string());
        entry.session.update_status(AuthMode::Both);

        let summary = entry.summary();
        assert!(summary.contains("DOMAIN: b.com"));
        assert!(summary.contains("Role: Mirror"));
        assert!(summary.contains("ready"));
        assert!(summary.contains("tok-123"));
        assert!(summary.contains("sid = 9"));
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("Example.COM"), "example.com");
        assert_eq!(normalize_domain("https://example.com/path"), "example.com");
        assert_eq!(normalize_domain("http://a.b.example.com"), "a.b.example.com");
        assert_eq!(normalize_domain("  example.com  "), "example.com");
    }
}
