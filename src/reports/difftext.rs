// File: difftext.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use anyhow::Result;

use super::{ExportData, ReportGenerator};
use crate::diff::unified_diff;

/// Plain-text report of mismatched results only, with unified diffs against
/// the primary and the full captured bodies.
pub struct DiffTextGenerator;

impl DiffTextGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for DiffTextGenerator {
    fn generate(&self, data: &ExportData) -> Result<String> {
        let mut out = String::new();
        out.push_str("rmirror Diff Report\n");
        out.push_str(&format!(
            "Generated: {}\n",
            data.generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&"=".repeat(80));
        out.push('\n');

        let mut mismatch_count = 0usize;
        for result in data.results.iter().filter(|r| !r.matched) {
            mismatch_count += 1;
            out.push('\n');
            out.push_str(&"=".repeat(80));
            out.push('\n');
            out.push_str(&format!("MISMATCH #{}\n", mismatch_count));
            out.push_str(&"=".repeat(80));
            out.push('\n');
            out.push_str(&format!("Request: {} {}\n", result.method, result.path));
            out.push_str(&format!("Time: {}\n\n", result.timestamp));

            out.push_str("Response Summary:\n");
            out.push_str(&"-".repeat(60));
            out.push('\n');
            for record in &result.responses {
                out.push_str(&format!(
                    "{}: status={}, size={}, hash={}\n",
                    record.domain,
                    record.status,
                    record.size,
                    record.hash.chars().take(16).collect::<String>()
                ));
            }

            if let Some(primary) = result.primary_response() {
                for other in result.responses.iter().skip(1) {
                    out.push_str(&format!("\n\nDiff: {} vs {}\n", primary.domain, other.domain));
                    out.push_str(&"-".repeat(60));
                    out.push('\n');
                    for line in unified_diff(
                        &primary.body,
                        &other.body,
                        &primary.domain,
                        &other.domain,
                        usize::MAX,
                    ) {
                        out.push_str(&line);
                        out.push('\n');
                    }
                }
            }

            out.push_str("\n\nFull Response Bodies:\n");
            out.push_str(&"-".repeat(60));
            out.push('\n');
            for record in &result.responses {
                out.push_str(&format!("\n--- {} ---\n", record.domain));
                if record.body.is_empty() {
                    out.push_str("(empty)\n");
                } else {
                    out.push_str(&record.body);
                    out.push('\n');
                }
            }
        }

        out.push_str("\n\n");
        out.push_str(&"=".repeat(80));
        out.push('\n');
        out.push_str(&format!("Total mismatches: {}\n", mismatch_count));
        Ok(out)
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn content_type(&self) -> &'static str {
        "text/plain"
    }
}
