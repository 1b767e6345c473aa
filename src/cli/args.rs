//! CLI argument definitions using clap
//!
//! Commands:
//! - catalogd check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// catalogd - reconciliation and notification engine for the application catalog
#[derive(Parser, Debug)]
#[command(name = "catalogd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate a configuration file, then print the effective values
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./catalogd.json")]
        config: PathBuf,
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
    fn test_check_config_default_path() {
        let cli = Cli::try_parse_from(["catalogd", "check-config"]).unwrap();
        match cli.command {
            Command::CheckConfig { config } => assert_eq!(config, PathBuf::from("./catalogd.json")),
        }
    }

    #[test]
    fn test_check_config_explicit_path() {
        let cli = Cli::try_parse_from(["catalogd", "check-config", "--config", "/etc/catalogd.json"]).unwrap();
        match cli.command {
            Command::CheckConfig { config } => assert_eq!(config, PathBuf::from("/etc/catalogd.json")),
        }
    }
}
