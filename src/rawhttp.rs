// File: rawhttp.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

//! Plain parsing over raw HTTP/1.x message bytes as handed over by the
//! capture host. Head and body split on the first blank line, tolerant of
//! both CRLF and LF line endings; the original separator is kept so a
//! rebuilt message round-trips byte-for-byte.

/// A parsed request: request line, header lines, body.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub request_line: String,
    pub headers: Vec<String>,
    pub body: String,
    pub line_sep: &'static str,
}

fn split_message(raw: &str) -> (&str, &str, &'static str) {
    if let Some(idx) = raw.find("\r\n\r\n") {
        (&raw[..idx], &raw[idx + 4..], "\r\n")
    } else if let Some(idx) = raw.find("\n\n") {
        (&raw[..idx], &raw[idx + 2..], "\n")
    } else {
        let sep = if raw.contains("\r\n") { "\r\n" } else { "\n" };
        (raw, "", sep)
    }
}

fn header_value<'a>(headers: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}:", name.to_lowercase());
    headers
        .iter()
        .find(|h| h.to_lowercase().starts_with(&prefix))
        .map(|h| h.splitn(2, ':').nth(1).unwrap_or("").trim())
}

impl RawRequest {
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let (head, body, line_sep) = split_message(&text);
        let mut lines = head.split(line_sep);
        let request_line = lines.next().unwrap_or("").to_string();
        let headers: Vec<String> = lines.map(|l| l.to_string()).collect();
        Self {
            request_line,
            headers,
            body: body.to_string(),
            line_sep,
        }
    }

    pub fn method(&self) -> &str {
        self.request_line.split(' ').next().unwrap_or("GET")
    }

    /// Path (with query) from the request line; `/` when it cannot be read.
    pub fn path(&self) -> &str {
        self.request_line.split(' ').nth(1).unwrap_or("/")
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&self.request_line);
        for header in &self.headers {
            out.push_str(self.line_sep);
            out.push_str(header);
        }
        out.push_str(self.line_sep);
        out.push_str(self.line_sep);
        out.push_str(&self.body);
        out.into_bytes()
    }
}

/// A parsed response: status, header lines, body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<String>,
    pub body: String,
}

impl RawResponse {
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let (head, body, line_sep) = split_message(&text);
        let mut lines = head.split(line_sep);
        let status_line = lines.next().unwrap_or("").to_string();
        let headers: Vec<String> = lines.map(|l| l.to_string()).collect();
        Self {
            status_line,
            headers,
            body: body.to_string(),
        }
    }

    /// Numeric status code; 0 when the status line is unreadable.
    pub fn status(&self) -> u16 {
        self.status_line
            .split(' ')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// Every `Set-Cookie:` header value, in header order.
    pub fn set_cookie_values(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.to_lowercase().starts_with("set-cookie:"))
            .map(|h| h.splitn(2, ':').nth(1).unwrap_or("").trim())
            .collect()
    }
}

/// Serialize a response back to wire form, CRLF-separated.
pub fn build_response_bytes(status: u16, reason: &str, headers: &[(String, String)], body: &str) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {} {}\r\n", status, reason);
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out.into_bytes()
}
