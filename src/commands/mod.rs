// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

use anyhow::Result;
use colored::*;

use crate::cli::{ExportArgs, RunArgs};

pub mod export;
pub mod run;

pub async fn handle_run_command(args: &RunArgs) -> Result<()> {
    run::execute(args).await
}

pub async fn handle_export_command(args: &ExportArgs) -> Result<()> {
    export::execute(args).await
}

fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
