//! EasyFi wallet host command-line interface.

pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// EasyFi - wallet desktop host
#[derive(Parser)]
#[command(name = "easyfi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "EASYFI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the host: IPC listener plus the main window
    Run(commands::run::RunArgs),

    /// List the operations the UI may invoke
    Methods(commands::methods::MethodsArgs),

    /// Invoke one operation against a running host
    Call(commands::call::CallArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config;
    match cli.command {
        Commands::Run(args) => commands::run::run(args, config_path.as_deref()).await,
        Commands::Methods(args) => commands::methods::run(args),
        Commands::Call(args) => commands::call::run(args).await,
        Commands::Config(args) => commands::config::run(args, config_path.as_deref()).await,
        Commands::Version => {
            println!("easyfi {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_version() {
        let cli = Cli::try_parse_from(["easyfi", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "easyfi",
            "run",
            "--headless",
            "--port",
            "4100",
            "--ui-command",
            "./wallet-ui",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert!(args.headless);
                assert_eq!(args.port, Some(4100));
                assert_eq!(args.ui_command.as_deref(), Some("./wallet-ui"));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["easyfi", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert!(!args.headless);
                assert!(args.port.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_call() {
        let cli = Cli::try_parse_from([
            "easyfi",
            "call",
            "--url",
            "ws://127.0.0.1:4100/ipc",
            "--token",
            "abc",
            "secure-storage:set",
            "pk_1",
            "value",
        ])
        .unwrap();
        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.method, "secure-storage:set");
                assert_eq!(args.args, vec!["pk_1", "value"]);
                assert_eq!(args.token, "abc");
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_parse_config_init_force() {
        let cli = Cli::try_parse_from(["easyfi", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(args) => {
                assert!(matches!(
                    args.command,
                    commands::config::ConfigCommand::Init { force: true }
                ));
            }
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["easyfi", "methods", "--config", "/tmp/easyfi.json5"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/easyfi.json5")));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["easyfi", "agent"]).is_err());
    }
}
