// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_inception)]
#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::new_without_default)]

pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod error;
pub mod rawhttp;
pub mod refresh;
pub mod registry;
pub mod reports;
pub mod results;
pub mod rewrite;
pub mod transport;
