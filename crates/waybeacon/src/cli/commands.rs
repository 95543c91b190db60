//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Record command arguments.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// WGS84 latitude in degrees
    #[arg(long)]
    pub lat: f64,

    /// WGS84 longitude in degrees
    #[arg(long)]
    pub lon: f64,

    /// Radius of uncertainty in meters
    #[arg(long, default_value = "10.0")]
    pub accuracy: f64,

    /// Trip id to correlate the sample to (defaults to the stored active trip)
    #[arg(long)]
    pub trip: Option<String>,
}

/// Buffer management commands.
#[derive(Debug, Subcommand)]
pub enum BufferCommand {
    /// Show buffered samples
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Drop every buffered sample
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
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
