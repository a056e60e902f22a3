// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::results::MirrorResult;

pub mod csv;
pub mod difftext;
pub mod json;

/// Snapshot handed to report generators. Never a live view of the store.
#[derive(Debug, Clone)]
pub struct ExportData {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<MirrorResult>,
}

pub trait ReportGenerator {
    fn generate(&self, data: &ExportData) -> Result<String>;
    fn file_extension(&self) -> &'static str;
    fn content_type(&self) -> &'static str;
}

pub struct ReportEngine;

impl Default for ReportEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn create_export_data(&self, results: Vec<MirrorResult>) -> ExportData {
        ExportData {
            generated_at: Utc::now(),
            results,
        }
    }

    pub fn get_generator(&self, format: &str) -> Result<Box<dyn ReportGenerator>> {
        match format.to_lowercase().as_str() {
            "json" => Ok(Box::new(json::JsonGenerator::new())),
            "csv" => Ok(Box::new(csv::CsvGenerator::new())),
            "diff" | "text" | "txt" => Ok(Box::new(difftext::DiffTextGenerator::new())),
            _ => Err(anyhow::anyhow!("Unsupported report format: {}", format)),
        }
    }

    pub fn generate_report<P: AsRef<Path>>(
        &self,
        format: &str,
        data: &ExportData,
        output_path: Option<P>,
    ) -> Result<String> {
        let generator = self.get_generator(format)?;
        let content = generator.generate(data)?;

        if let Some(path) = output_path {
            std::fs::write(path, &content)?;
        }

        Ok(content)
    }
}
