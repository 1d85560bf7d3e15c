// Toolgate - Main Entry Point
//
// Usage metering and quota gateway that fronts AI tool endpoints:
// - Rolling-window usage counters per owner and tool
// - Plan-based entitlements (guest, free, starter, pro)
// - Quota-gated proxying to upstream inference providers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use toolgate::config::Config;
use toolgate::http::{self, state::AppState};

/// Toolgate: usage metering and quota gateway
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author = "Toolgate Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Usage metering and quota gateway for AI tool endpoints", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "toolgate.toml")]
        config: PathBuf,

        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate a configuration file and exit
    CheckConfig {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "toolgate.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Serve { config, port }) => {
            let mut config =
                Config::load_from_path(&config).context("Failed to load configuration")?;
            if let Some(port) = port {
                config.server.port = port;
            }

            init_tracing(&config, args.verbose)?;
            info!("toolgate v0.1.0 starting on port {}", config.server.port);

            let state = AppState::from_config(config);
            http::serve(state).await?;
        }
        Some(Commands::CheckConfig { config: path }) => {
            init_tracing(&Config::default(), args.verbose)?;

            let config =
                Config::load_from_path(&path).context("Configuration is invalid")?;
            info!(
                "Configuration OK: {} session token(s), {} upstream tool(s)",
                config.sessions.len(),
                config.upstream_urls().len()
            );
        }
        None => {
            init_tracing(&Config::default(), args.verbose)?;
            info!("No command specified. Use \"toolgate --help\" for usage.");
        }
    }

    Ok(())
}

/// Initialize tracing from the configured level and format; `--verbose`
/// forces DEBUG regardless of configuration.
fn init_tracing(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level()?
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        );

    match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}
