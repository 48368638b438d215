//! Command-line interface definition for Butterbot
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// Butterbot - liveness monitoring daemon
///
/// Checks HTTP endpoints and Kafka topics on a fixed interval and posts
/// webhook notifications when a target goes down or comes back up.
#[derive(Parser, Debug, Clone)]
#[command(name = "butterbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long = "config-file",
        default_value = "config.yaml",
        env = "BUTTERBOT_CONFIG_FILE"
    )]
    pub config_file: String,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit JSON logs (true) or human-readable logs (false)
    #[arg(long)]
    pub json_logs: Option<bool>,

    /// Command to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for Butterbot
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the monitoring loop
    Run {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Load and validate the configuration, then exit
    Validate,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to execute, `run` when none was given
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Run { once: false })
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            log_level: None,
            json_logs: None,
            command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config_file, "config.yaml");
        assert!(cli.log_level.is_none());
        assert_eq!(cli.command(), Commands::Run { once: false });
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "butterbot",
            "--config-file",
            "/etc/butterbot.yaml",
            "--log-level",
            "debug",
            "--json-logs",
            "false",
        ])
        .unwrap();

        assert_eq!(cli.config_file, "/etc/butterbot.yaml");
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.json_logs, Some(false));
        assert_eq!(cli.command(), Commands::Run { once: false });
    }

    #[test]
    fn test_parse_run_once() {
        let cli = Cli::try_parse_from(["butterbot", "run", "--once"]).unwrap();
        assert_eq!(cli.command(), Commands::Run { once: true });
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["butterbot", "-c", "cfg.yaml", "validate"]).unwrap();
        assert_eq!(cli.config_file, "cfg.yaml");
        assert_eq!(cli.command(), Commands::Validate);
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["butterbot", "chat"]).is_err());
    }
}
