// File: run.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use super::{print_error, print_info, print_success, print_warning};
use crate::cli::RunArgs;
use crate::config::MirrorConfig;
use crate::engine::{MirrorEngine, TrafficTool};
use crate::reports::ReportEngine;
use crate::transport::HttpTransport;

/// One line of the captured-exchange stream handed over by the capture
/// host. A record without a `response` field is a request leg only.
#[derive(Debug, Deserialize)]
struct ExchangeRecord {
    host: String,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    scheme: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    request: String,
    #[serde(default)]
    response: Option<String>,
}

const ALL_TOOLS: [TrafficTool; 6] = [
    TrafficTool::Proxy,
    TrafficTool::Repeater,
    TrafficTool::Scanner,
    TrafficTool::Intruder,
    TrafficTool::Extension,
    TrafficTool::Other,
];

pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = MirrorConfig::new();
    config.set_request_timeout_secs(args.timeout);
    config.set_max_concurrent_mirrors(args.max_concurrent);
    config.set_max_results(args.max_results);
    config.set_auto_refresh_mirrors(!args.no_auto_refresh);
    config.set_mirror_enabled(true);

    let transport = Arc::new(HttpTransport::new()?);
    let engine = MirrorEngine::new(config, transport);

    let domains = args.parsed_domains().map_err(|e| anyhow!(e))?;
    for (idx, (host, domain_config)) in domains.into_iter().enumerate() {
        let mode = domain_config.auth_mode;
        engine.registry().add(&host, domain_config)?;
        if idx == 0 {
            print_info(&format!("Primary: {} [{}]", host, mode));
        } else {
            print_info(&format!("Mirror:  {} [{}]", host, mode));
        }
    }
    if engine.registry().mirrors().is_empty() {
        print_warning("No mirror domains configured - exchanges will not be mirrored");
    }

    for tool in ALL_TOOLS {
        engine.set_tool_trigger(tool, false);
    }
    for name in &args.mirror_from {
        let tool: TrafficTool = name.parse().map_err(|e: String| anyhow!(e))?;
        engine.set_tool_trigger(tool, true);
    }

    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(std::io::stdin().lock())
    } else {
        let file = std::fs::File::open(&args.input)
            .with_context(|| format!("Failed to open exchange stream: {}", args.input))?;
        Box::new(std::io::BufReader::new(file))
    };

    let mut processed = 0usize;
    let mut skipped = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read exchange stream")?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ExchangeRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(error) => {
                print_warning(&format!("Line {}: unreadable record ({})", line_no + 1, error));
                skipped += 1;
                continue;
            }
        };

        let request = match STANDARD.decode(record.request.as_bytes()) {
            Ok(bytes) => bytes,
            Err(error) => {
                print_warning(&format!("Line {}: bad request encoding ({})", line_no + 1, error));
                skipped += 1;
                continue;
            }
        };

        let tool = record
            .tool
            .as_deref()
            .unwrap_or("proxy")
            .parse()
            .unwrap_or(TrafficTool::Other);
        let https = record.scheme.as_deref().unwrap_or("https") == "https";
        let port = record.port.unwrap_or(if https { 443 } else { 80 });

        engine.on_request(&record.host, tool, &request).await;

        if let Some(encoded) = &record.response {
            match STANDARD.decode(encoded.as_bytes()) {
                Ok(response) => {
                    engine
                        .on_response(&record.host, tool, https, port, &request, &response)
                        .await;
                }
                Err(error) => {
                    print_warning(&format!(
                        "Line {}: bad response encoding ({})",
                        line_no + 1,
                        error
                    ));
                    skipped += 1;
                    continue;
                }
            }
        }
        processed += 1;
    }

    let store = engine.store();
    print_success(&format!(
        "Processed {} exchange(s), {} skipped",
        processed, skipped
    ));
    print_info(&format!(
        "Results: {} total, {} mismatches",
        store.len(),
        store.mismatch_count()
    ));

    for domain in engine.registry().domains() {
        if let Some(summary) = engine.registry().with_domain(&domain, |entry| entry.summary()) {
            println!("{}", summary);
        }
    }

    let report_engine = ReportEngine::new();
    let data = report_engine.create_export_data(store.snapshot());
    let outputs = [
        ("json", args.session_out.as_ref()),
        ("csv", args.csv_out.as_ref()),
        ("diff", args.diff_report.as_ref()),
    ];
    for (format, path) in outputs {
        let Some(path) = path else { continue };
        match report_engine.generate_report(format, &data, Some(path)) {
            Ok(_) => print_success(&format!("Wrote {} report to {}", format, path.display())),
            Err(error) => print_error(&format!(
                "Failed to write {} report to {}: {}",
                format,
                path.display(),
                error
            )),
        }
    }

    Ok(())
}
