// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{AuthMode, DomainConfig};

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long = "log-level", default_value = "warn", global = true)]
    pub log_level: String,

    #[arg(long = "no-color", help = "Disable colored output", global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Run(RunArgs),
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Tracked domain spec: host[=mode] with mode one of
    /// auto|cookies|bearer|both|none|custom:NAME:VALUE.
    /// The first spec becomes the primary domain.
    #[arg(short = 'd', long = "domain", required = true)]
    pub domains: Vec<String>,

    /// JSON-lines exchange stream to replay; "-" reads stdin
    #[arg(short = 'i', long = "input", default_value = "-")]
    pub input: String,

    #[arg(
        short = 't',
        long = "timeout",
        default_value_t = 15,
        help = "Per-mirror request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(
        short = 'w',
        long = "max-concurrent",
        default_value_t = 10,
        help = "Maximum simultaneous mirror requests"
    )]
    pub max_concurrent: usize,

    #[arg(long = "max-results", default_value_t = 1000)]
    pub max_results: usize,

    /// Tools that trigger mirroring (proxy, repeater, scanner, intruder, extension)
    #[arg(long = "mirror-from", default_value = "proxy")]
    pub mirror_from: Vec<String>,

    #[arg(long = "no-auto-refresh", help = "Do not refresh mirrors when the primary refreshes")]
    pub no_auto_refresh: bool,

    #[arg(long = "session-out", help = "Write the session results JSON here")]
    pub session_out: Option<PathBuf>,

    #[arg(long = "csv-out", help = "Write the CSV summary here")]
    pub csv_out: Option<PathBuf>,

    #[arg(long = "diff-report", help = "Write the mismatch diff report here")]
    pub diff_report: Option<PathBuf>,
}

impl RunArgs {
    pub fn parsed_domains(&self) -> Result<Vec<(String, DomainConfig)>, String> {
        self.domains.iter().map(|s| parse_domain_spec(s)).collect()
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// A session results file produced by --session-out
    pub session: PathBuf,

    #[arg(short = 'f', long = "format", default_value = "json")]
    pub format: String,

    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

/// Parse `host[=mode]`, where a custom-header mode carries its header as
/// `custom:NAME:VALUE`.
pub fn parse_domain_spec(spec: &str) -> Result<(String, DomainConfig), String> {
    let (host, mode_spec) = match spec.split_once('=') {
        Some((host, mode)) => (host, Some(mode)),
        None => (spec, None),
    };
    let host = host.trim();
    if host.is_empty() {
        return Err(format!("empty host in domain spec: {}", spec));
    }

    let Some(mode_spec) = mode_spec else {
        return Ok((host.to_string(), DomainConfig::default()));
    };

    if let Some(rest) = mode_spec.strip_prefix("custom:") {
        let (name, value) = rest
            .split_once(':')
            .ok_or_else(|| format!("custom mode needs NAME:VALUE in: {}", spec))?;
        if name.trim().is_empty() {
            return Err(format!("custom header name missing in: {}", spec));
        }
        return Ok((
            host.to_string(),
            DomainConfig {
                auth_mode: AuthMode::CustomHeader,
                custom_header_name: name.trim().to_string(),
                custom_header_value: value.trim().to_string(),
            },
        ));
    }

    let auth_mode: AuthMode = mode_spec.parse()?;
    Ok((host.to_string(), DomainConfig::with_mode(auth_mode)))
}
