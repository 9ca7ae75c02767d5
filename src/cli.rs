//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Natural-language agent gateway for the application REST API
#[derive(Parser, Debug)]
#[command(name = "agent-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "AGENT_GATEWAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "AGENT_GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "AGENT_GATEWAY_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "AGENT_GATEWAY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "AGENT_GATEWAY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway server (default)
    Serve,

    /// Inspect the allow-listed operations
    #[command(subcommand)]
    Operations(OperationsCommand),

    /// Run one prompt through the agent and print the result envelope
    Ask {
        /// Free-text instruction
        #[arg(required = true)]
        prompt: String,

        /// Raw bearer token forwarded to the application API
        #[arg(long, env = "AGENT_GATEWAY_TOKEN")]
        token: Option<String>,

        /// User id reported as the initiator
        #[arg(long, default_value = "cli")]
        user: String,
    },
}

/// Operation catalog subcommands
#[derive(Subcommand, Debug)]
pub enum OperationsCommand {
    /// List operations
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check the catalog invariants
    Validate,
}

/// Output format for listings
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable
    Text,
    /// JSON
    Json,
    /// YAML
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_server_mode() {
        let cli = Cli::try_parse_from(["agent-gateway"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn parses_ask_with_token() {
        let cli = Cli::try_parse_from([
            "agent-gateway",
            "ask",
            "show jdoe",
            "--token",
            "Bearer abc",
            "--user",
            "u-1",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Ask { prompt, token, user }) => {
                assert_eq!(prompt, "show jdoe");
                assert_eq!(token.as_deref(), Some("Bearer abc"));
                assert_eq!(user, "u-1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_operations_list_format() {
        let cli = Cli::try_parse_from([
            "agent-gateway",
            "operations",
            "list",
            "--format",
            "yaml",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Operations(OperationsCommand::List {
                format: OutputFormat::Yaml
            }))
        ));
    }
}
