//! CLI module for SpaceOdT.
//!
//! This module provides the command-line interface for exports,
//! provisioning runs, the local UI and lab helpers.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, TransformCommands};
pub use output::OutputFormatter;
