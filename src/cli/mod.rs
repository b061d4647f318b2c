//! CLI module
//!
//! Provides command-line interface for:
//! - check-config: validate a replica configuration file
//! - drill: in-memory failover drill on a simulated clock

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, drill, run_command, run_drill, DrillReport};
pub use errors::{CliError, CliErrorCode, CliResult};

/// Parse process arguments and run the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
