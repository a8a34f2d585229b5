//! AgentGate CLI, the main entry point.
//!
//! Commands:
//! - `serve`   expose the built-in tools over JSON-RPC on stdio
//! - `run`     drive one agent session from a prompt to a validated finish
//! - `tools`   print the tool catalog
//! - `config`  show the effective configuration

use std::path::PathBuf;

use agentgate_config::AppConfig;
use clap::{Parser, Subcommand};

mod commands;
mod console;

#[derive(Parser)]
#[command(
    name = "agentgate",
    about = "AgentGate: tool-calling agent loop with a validate-before-done gate",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.agentgate/config.toml
    #[arg(short, long, global = true, env = "AGENTGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tool registry over newline-delimited JSON-RPC on stdio
    Serve,

    /// Run the agent on a prompt until the gate approves completion
    Run {
        /// Opening user prompt
        #[arg(short, long)]
        prompt: String,

        /// Request whole responses instead of streaming
        #[arg(long)]
        no_stream: bool,

        /// Override the turn limit (0 = unbounded)
        #[arg(long)]
        max_turns: Option<u32>,
    },

    /// List the available tools
    Tools {
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Print the built-in defaults as TOML instead
        #[arg(long)]
        defaults: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries the JSON-RPC wire in serve mode, so logs go to stderr.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::Serve => commands::serve::run(config).await?,
        Commands::Run {
            prompt,
            no_stream,
            max_turns,
        } => commands::run::run(config, prompt, no_stream, max_turns).await?,
        Commands::Tools { json } => commands::tools::run(config, json)?,
        Commands::Config { defaults } => commands::config_cmd::run(config, defaults)?,
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig, agentgate_config::ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
}
