// File: csv.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use anyhow::Result;

use super::{ExportData, ReportGenerator};

/// One row per mirrored exchange, hashes truncated for scanning by eye.
pub struct CsvGenerator;

impl CsvGenerator {
    pub fn new() -> Self {
        Self
    }

    fn escape_csv(&self, field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace("\"", "\"\""))
        } else {
            field.to_string()
        }
    }
}

impl ReportGenerator for CsvGenerator {
    fn generate(&self, data: &ExportData) -> Result<String> {
        let mut csv = String::new();
        csv.push_str("Index,Method,Path,Match,Timestamp,Domains,Hashes\n");

        for (i, result) in data.results.iter().enumerate() {
            let domains = result
                .responses
                .iter()
                .map(|r| r.domain.as_str())
                .collect::<Vec<_>>()
                .join(";");
            let hashes = result
                .responses
                .iter()
                .map(|r| r.hash.chars().take(8).collect::<String>())
                .collect::<Vec<_>>()
                .join(";");

            csv.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                i + 1,
                self.escape_csv(&result.method),
                self.escape_csv(&result.path),
                if result.matched { "Yes" } else { "No" },
                self.escape_csv(&result.timestamp),
                self.escape_csv(&domains),
                self.escape_csv(&hashes),
            ));
        }

        Ok(csv)
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn content_type(&self) -> &'static str {
        "text/csv"
    }
}
