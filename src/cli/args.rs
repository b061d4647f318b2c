//! CLI argument definitions using clap
//!
//! Commands:
//! - replicore check-config --config <path>
//! - replicore drill [--config <path>] [--entries <n>] [--kill-primary-after <n>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// replicore - deterministic primary/secondary replication core
#[derive(Parser, Debug)]
#[command(name = "replicore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Validate a replica configuration file and print the effective values
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./replicore.json")]
        config: PathBuf,
    },

    /// Run an in-memory failover drill on a simulated clock
    Drill {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Total entries to write
        #[arg(long, default_value_t = 100)]
        entries: u64,

        /// Crash the primary after this many entries
        #[arg(long, default_value_t = 50)]
        kill_primary_after: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drill() {
        let cli = Cli::try_parse_from([
            "replicore",
            "drill",
            "--entries",
            "20",
            "--kill-primary-after",
            "7",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::Drill {
                config: None,
                entries: 20,
                kill_primary_after: 7,
            }
        );
    }

    #[test]
    fn test_check_config_default_path() {
        let cli = Cli::try_parse_from(["replicore", "check-config"]).unwrap();
        assert_eq!(
            cli.command,
            Command::CheckConfig {
                config: PathBuf::from("./replicore.json"),
            }
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["replicore", "serve"]).is_err());
    }
}
