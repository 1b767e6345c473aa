//! CLI command implementations

use std::io::Write;
use std::path::Path;

use crate::config::CatalogConfig;
use crate::observability::{Event, Logger};

use super::args::{Cli, Command};
use super::errors::CliResult;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::CheckConfig { config } => check_config(&config, &mut std::io::stdout()),
    }
}

/// Load and validate a config file, apply its log level and write the
/// effective configuration as pretty JSON.
pub fn check_config(config_path: &Path, out: &mut impl Write) -> CliResult<()> {
    let config = CatalogConfig::load(config_path)?;
    Logger::set_min_severity(config.severity()?);

    let path = config_path.display().to_string();
    let capacity = config.listener_capacity.to_string();
    Logger::info(
        Event::ConfigLoaded.as_str(),
        &[
            ("listener_capacity", capacity.as_str()),
            ("overflow_policy", config.overflow_policy.as_str()),
            ("path", path.as_str()),
        ],
    );

    serde_json::to_writer_pretty(&mut *out, &config)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_check_config_prints_effective_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalogd.json");
        std::fs::write(&path, r#"{"listener_capacity": 8, "overflow_policy": "disconnect"}"#).unwrap();

        let mut out = Vec::new();
        check_config(&path, &mut out).unwrap();

        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["listener_capacity"], 8);
        assert_eq!(printed["overflow_policy"], "disconnect");
        assert_eq!(printed["delivery_timeout_ms"], 5000);
        assert_eq!(printed["log_level"], "info");
    }

    #[test]
    fn test_check_config_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = check_config(&dir.path().join("absent.json"), &mut Vec::new()).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_check_config_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalogd.json");
        std::fs::write(&path, r#"{"listener_capacity": 0}"#).unwrap();

        let err = check_config(&path, &mut Vec::new()).unwrap_err();
        assert!(err.message().contains("listener_capacity"));
    }
}
