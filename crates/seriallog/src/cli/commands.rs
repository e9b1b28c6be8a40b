//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// The serial port to connect to (e.g. /dev/ttyUSB0, COM5)
    #[arg(short, long)]
    pub port: String,

    /// The baud rate for the serial connection (e.g. 9600, 115200)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub baud: u32,

    /// Write to this file instead of the configured output path
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Ports command arguments.
#[derive(Debug, Args)]
pub struct PortsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
