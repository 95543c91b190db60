//! Command-line interface for waybeacon.
//!
//! This module provides the CLI structure and command definitions for the
//! `waybc` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{BufferCommand, ConfigCommand, RecordCommand, StatusCommand};

/// waybc - Offline-buffered GPS telemetry uplink
///
/// Buffers location samples in a durable local store and delivers them
/// to a remote collector when connectivity and credentials allow it.
#[derive(Debug, Parser)]
#[command(name = "waybc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the uplink service in the foreground
    Run,

    /// Show buffer and uplink status
    Status(StatusCommand),

    /// Record a single location sample into the buffer
    Record(RecordCommand),

    /// Attempt one delivery of the buffered samples now
    Flush,

    /// Inspect or clear the sample buffer
    #[command(subcommand)]
    Buffer(BufferCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "waybc");
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_quiet() {
        let cli = Cli {
            config: None,
            verbose: 0,
            quiet: true,
            command: Command::Flush,
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_normal() {
        let cli = Cli {
            config: None,
            verbose: 0,
            quiet: false,
            command: Command::Flush,
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_verbose() {
        let cli = Cli {
            config: None,
            verbose: 1,
            quiet: false,
            command: Command::Flush,
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_trace() {
        let cli = Cli {
            config: None,
            verbose: 2,
            quiet: false,
            command: Command::Flush,
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_parse_run() {
        let args = vec!["waybc", "run"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Command::Run));
    }

    #[test]
    fn test_parse_status() {
        let args = vec!["waybc", "status", "--json"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Status(StatusCommand { json: true })
        ));
    }

    #[test]
    fn test_parse_record() {
        let args = vec![
            "waybc", "record", "--lat", "59.33", "--lon", "18.06", "--accuracy", "4.5",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Record(cmd) => {
                assert!((cmd.lat - 59.33).abs() < f64::EPSILON);
                assert!((cmd.lon - 18.06).abs() < f64::EPSILON);
                assert!((cmd.accuracy - 4.5).abs() < f64::EPSILON);
                assert!(cmd.trip.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_record_default_accuracy() {
        let args = vec!["waybc", "record", "--lat", "1.0", "--lon", "2.0"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Record(cmd) => assert!((cmd.accuracy - 10.0).abs() < f64::EPSILON),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_flush() {
        let args = vec!["waybc", "flush"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Command::Flush));
    }

    #[test]
    fn test_parse_buffer_clear() {
        let args = vec!["waybc", "buffer", "clear", "--yes"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Buffer(BufferCommand::Clear { yes: true })
        ));
    }

    #[test]
    fn test_parse_config_path() {
        let args = vec!["waybc", "config", "path"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["waybc", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose() {
        let args = vec!["waybc", "-v", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_parse_with_quiet() {
        let args = vec!["waybc", "-q", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.quiet);
    }
}
