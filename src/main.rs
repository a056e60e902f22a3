// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use rmirror::cli::{Cli, Commands};
use rmirror::commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let level = cli
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Warn);
    SimpleLogger::new().with_level(level).init().ok();

    match &cli.command {
        Commands::Run(args) => commands::handle_run_command(args).await,
        Commands::Export(args) => commands::handle_export_command(args).await,
    }
}
