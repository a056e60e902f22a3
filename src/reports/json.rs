// File: json.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map, Value};

use super::{ExportData, ReportGenerator};
use crate::results::{MirrorResult, ResponseRecord};

/// Versioned session export: everything needed to reload results into
/// another operator session.
pub struct JsonGenerator;

impl JsonGenerator {
    pub fn new() -> Self {
        Self
    }
}

fn result_to_value(result: &MirrorResult) -> Value {
    let mut responses = Map::new();
    for record in &result.responses {
        responses.insert(
            record.domain.clone(),
            json!({
                "status": record.status,
                "size": record.size,
                "hash": record.hash,
                "body": record.body,
            }),
        );
    }
    json!({
        "method": result.method,
        "path": result.path,
        "timestamp": result.timestamp,
        "match": result.matched,
        "responses": Value::Object(responses),
    })
}

impl ReportGenerator for JsonGenerator {
    fn generate(&self, data: &ExportData) -> Result<String> {
        let results: Vec<Value> = data.results.iter().map(result_to_value).collect();
        let document = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "exported": data.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "results": results,
        });
        serde_json::to_string_pretty(&document).context("Failed to serialize session export")
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Parse a previously exported session document. A document without a
/// `results` field is rejected outright; individual missing fields inside a
/// result fall back to defaults.
pub fn import_session(content: &str) -> Result<Vec<MirrorResult>> {
    let document: Value =
        serde_json::from_str(content).context("Session file is not valid JSON")?;
    let results = document
        .get("results")
        .ok_or_else(|| anyhow!("Invalid session file format: missing 'results' field"))?
        .as_array()
        .ok_or_else(|| anyhow!("Invalid session file format: 'results' is not a list"))?;

    let mut imported = Vec::with_capacity(results.len());
    for item in results {
        let mut responses = Vec::new();
        if let Some(map) = item.get("responses").and_then(Value::as_object) {
            for (domain, record) in map {
                responses.push(ResponseRecord {
                    domain: domain.clone(),
                    status: record
                        .get("status")
                        .and_then(Value::as_u64)
                        .unwrap_or(0) as u16,
                    size: record.get("size").and_then(Value::as_u64).unwrap_or(0) as usize,
                    hash: string_field(record, "hash"),
                    body: string_field(record, "body"),
                });
            }
        }
        imported.push(MirrorResult {
            method: string_field(item, "method"),
            path: string_field(item, "path"),
            timestamp: string_field(item, "timestamp"),
            matched: item.get("match").and_then(Value::as_bool).unwrap_or(true),
            responses,
        });
    }
    Ok(imported)
}
