//! CLI module for catalogd
//!
//! Provides command-line interface for:
//! - check-config: Validate a configuration file and print the effective values

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
