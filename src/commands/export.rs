// File: export.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use anyhow::{Context, Result};

use super::{print_info, print_success};
use crate::cli::ExportArgs;
use crate::reports::{json::import_session, ReportEngine};

pub async fn execute(args: &ExportArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.session)
        .with_context(|| format!("Failed to read session file: {}", args.session.display()))?;
    let results = import_session(&content)?;
    print_info(&format!(
        "Loaded {} result(s) from {}",
        results.len(),
        args.session.display()
    ));

    let engine = ReportEngine::new();
    let data = engine.create_export_data(results);
    let rendered = engine.generate_report(&args.format, &data, args.output.as_ref())?;

    match &args.output {
        Some(path) => print_success(&format!("Wrote {} report to {}", args.format, path.display())),
        None => println!("{}", rendered),
    }

    Ok(())
}
