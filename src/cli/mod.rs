//! CLI Module
//!
//! Command-line interface for VoiceMorph using Clap v4.

mod commands;
mod serve;

pub use commands::load_config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// VoiceMorph - Telegram voice transformation bot
#[derive(Parser, Debug)]
#[command(name = "voicemorph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug mode (writes rolling log files)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Telegram bot and liveness endpoint (default)
    Serve,

    /// List the available effects and their filter graphs
    Effects {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply an effect to a local audio file
    Apply {
        /// Effect id, e.g. male_to_female
        #[arg(short, long)]
        effect: String,

        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the result
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration
    Config {
        /// Show full configuration including the bot token
        #[arg(short, long)]
        show_secrets: bool,
    },

    /// Log management operations
    Logs {
        #[command(subcommand)]
        operation: LogCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show log file location and status
    Status,
    /// Clean up old log files
    Clean {
        /// Maximum age in days (default: 7)
        #[arg(short = 'a', long, default_value = "7")]
        days: u64,
    },
}

/// Main CLI entry point
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    match cli.command {
        None | Some(Commands::Serve) => serve::cmd_serve(&config).await,
        Some(Commands::Effects { json }) => commands::cmd_effects(json),
        Some(Commands::Apply {
            effect,
            input,
            output,
        }) => commands::cmd_apply(&config, &effect, &input, &output).await,
        Some(Commands::Init { force }) => commands::cmd_init(force),
        Some(Commands::Config { show_secrets }) => commands::cmd_config(&config, show_secrets),
        Some(Commands::Logs { operation }) => commands::cmd_logs(operation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::try_parse_from(["voicemorph"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_apply_args() {
        let cli = Cli::try_parse_from([
            "voicemorph",
            "-d",
            "apply",
            "--effect",
            "female_soft",
            "--input",
            "in.ogg",
            "--output",
            "out.mp3",
        ])
        .unwrap();
        assert!(cli.debug);
        match cli.command {
            Some(Commands::Apply {
                effect,
                input,
                output,
            }) => {
                assert_eq!(effect, "female_soft");
                assert_eq!(input, PathBuf::from("in.ogg"));
                assert_eq!(output, PathBuf::from("out.mp3"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_logs_clean_default_days() {
        let cli = Cli::try_parse_from(["voicemorph", "logs", "clean"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Logs {
                operation: LogCommands::Clean { days: 7 }
            })
        ));
    }
}
