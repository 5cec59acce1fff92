//! kgw: kernel gateway client
//!
//! - `exec`: run code on a new or existing kernel and stream its output
//! - `list`: show the gateway's kernels
//! - `delete`: shut kernels down

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kg_cli::commands::{self, ExecOptions};
use kg_cli::output::print_error;
use kg_core::config::{self, GatewayConfig};
use kg_core::ConfigError;

#[derive(Parser)]
#[command(name = "kgw")]
#[command(author, version, about = "Jupyter kernel gateway client")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Gateway REST address (overrides config)
    #[arg(long, global = true, env = "KGW_API_URL")]
    api_url: Option<String>,

    /// Gateway WebSocket address (overrides config)
    #[arg(long, global = true, env = "KGW_WS_URL")]
    ws_url: Option<String>,

    /// Gateway auth token (overrides config)
    #[arg(long, global = true, env = "KGW_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute code on a kernel and print every message it sends back
    Exec {
        /// Code to execute
        code: String,
        /// Attach to this kernel instead of creating one
        #[arg(short, long)]
        kernel_id: Option<String>,
        /// Seconds to wait for the kernel to go idle
        #[arg(short, long, default_value_t = 30)]
        wait: u64,
        /// Keep a kernel created for this run
        #[arg(long)]
        keep: bool,
    },

    /// List running kernels
    List,

    /// Delete kernels
    Delete {
        /// Kernel identifier(s) to delete
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            print_error(&format!("{:#}", e));
            return Err(e);
        }
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, cancelling");
            signal_cancel.cancel();
        }
    });

    match cli.command {
        Commands::Exec {
            code,
            kernel_id,
            wait,
            keep,
        } => {
            let mut config = config;
            if kernel_id.is_some() {
                config.kernel_id = kernel_id;
            }
            let options = ExecOptions {
                wait: Duration::from_secs(wait),
                keep,
            };
            commands::exec_command(config, &code, &options, &cancel).await
        }
        Commands::List => commands::list_command(&config, &cancel).await,
        Commands::Delete { ids } => commands::delete_command(&config, &ids, &cancel).await,
    }
}

/// Load the config file and apply command-line overrides
fn resolve_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match config::load_config(&config::default_config_path()) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => GatewayConfig::default(),
            Err(e) => return Err(e).context("Failed to load default config"),
        },
    };

    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.clone();
    }
    if let Some(ws_url) = &cli.ws_url {
        config.ws_url = ws_url.clone();
    }
    if let Some(token) = &cli.token {
        config.auth_token = Some(token.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
