//! Agent Gateway - natural-language access to the application REST API

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use agent_gateway::{
    cli::{Cli, Command, OperationsCommand, OutputFormat},
    config::Config,
    gateway::{Gateway, build_orchestrator},
    routes::{builtin_catalog, builtin_operations},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match &cli.command {
        Some(Command::Operations(cmd)) => run_operations_command(cmd),
        Some(Command::Ask {
            prompt,
            token,
            user,
        }) => run_ask(&cli, prompt, token.as_deref(), user).await,
        Some(Command::Serve) | None => run_server(&cli).await,
    }
}

fn load_config(cli: &Cli) -> Option<Config> {
    match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            Some(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            None
        }
    }
}

/// Run operation catalog commands
fn run_operations_command(cmd: &OperationsCommand) -> ExitCode {
    match cmd {
        OperationsCommand::Validate => match builtin_catalog() {
            Ok(catalog) => {
                println!("✅ {} operations - valid", catalog.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Validation failed: {e}");
                ExitCode::FAILURE
            }
        },

        OperationsCommand::List { format } => {
            let operations = builtin_operations();
            let rendered = match format {
                OutputFormat::Json => {
                    serde_json::to_string_pretty(&operations).map_err(|e| e.to_string())
                }
                OutputFormat::Yaml => {
                    serde_yaml::to_string(&operations).map_err(|e| e.to_string())
                }
                OutputFormat::Text => {
                    println!("{} operations:\n", operations.len());
                    for op in &operations {
                        let auth = if op.requires_auth { " [auth]" } else { "" };
                        println!("  {} - {} {}{}", op.name, op.method, op.path_template, auth);
                        println!("      {}", op.description);
                        for p in &op.parameters {
                            let required = if p.required { "required" } else { "optional" };
                            println!(
                                "      • {} ({}, {}) {}",
                                p.name, p.location, required, p.description
                            );
                        }
                    }
                    return ExitCode::SUCCESS;
                }
            };

            match rendered {
                Ok(text) => {
                    println!("{text}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("❌ Failed to serialize operations: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Run a single prompt through the orchestrator
async fn run_ask(cli: &Cli, prompt: &str, token: Option<&str>, user: &str) -> ExitCode {
    let Some(config) = load_config(cli) else {
        return ExitCode::FAILURE;
    };

    let orchestrator = match build_orchestrator(&config) {
        Ok(o) => o,
        Err(e) => {
            error!("Failed to create agent: {e}");
            return ExitCode::FAILURE;
        }
    };

    let credential = token.map(|t| {
        if t.contains(' ') {
            t.to_string()
        } else {
            format!("Bearer {t}")
        }
    });

    let response = orchestrator.run(prompt, credential.as_deref(), user).await;

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("❌ Failed to serialize response: {e}");
            return ExitCode::FAILURE;
        }
    }

    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run_server(cli: &Cli) -> ExitCode {
    let Some(config) = load_config(cli) else {
        return ExitCode::FAILURE;
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        auth = config.auth.enabled,
        "Starting Agent Gateway"
    );

    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
