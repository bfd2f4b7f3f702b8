//! # Brain Server
//!
//! Entry point for the Brain Link gateway proxy and channel watcher.
//!
//! # Usage
//!
//! ```bash
//! # Run the proxy with defaults
//! brain-server serve
//!
//! # Run with a configuration file and a different gateway
//! brain-server --config brain.yaml serve --gateway-url https://gateway.example.com
//!
//! # Follow the market-data channel for one symbol
//! BRAIN_WS_URL=wss://gateway.example.com/ws brain-server watch market --symbol ETH-USD
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use anyhow::{Context, bail};
use brain_core::config::{ConfigLoader, Validatable};
use brain_proxy::ProxyServer;
use brain_telemetry::logging::init_logging;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use brain_server::config::ENV_PREFIX;
use brain_server::shutdown::setup_signal_handlers;
use brain_server::{FeedKind, ServerConfig, ShutdownController, Watcher};

/// Brain Link server
#[derive(Parser, Debug)]
#[command(name = "brain-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML, TOML or JSON)
    #[arg(short, long, default_value = "brain.yaml", global = true)]
    config: PathBuf,

    /// Override the log level or filter
    #[arg(long, env = "BRAIN_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long, global = true)]
    validate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway proxy
    Serve {
        /// Override listen host
        #[arg(long, env = "BRAIN_HOST")]
        host: Option<String>,

        /// Override listen port
        #[arg(long, env = "BRAIN_PORT")]
        port: Option<u16>,

        /// Override the gateway base URL
        #[arg(long, env = "BRAIN_GATEWAY_URL")]
        gateway_url: Option<String>,
    },

    /// Attach a feed to a channel and log what arrives
    Watch {
        /// Feed to attach
        #[arg(value_enum)]
        feed: FeedKind,

        /// Channel name; defaults to the feed's usual channel
        #[arg(long)]
        channel: Option<String>,

        /// Symbol for the market feed
        #[arg(long, default_value = "BTC-USD")]
        symbol: String,

        /// Override the channel base URL
        #[arg(long, env = "BRAIN_WS_URL")]
        ws_url: Option<String>,

        /// Seconds between feed summaries
        #[arg(long, default_value_t = 10)]
        report_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.validate {
        println!("Configuration is valid");
        return Ok(());
    }

    let _guards = init_logging(&config.logging).context("failed to initialize logging")?;

    let shutdown = ShutdownController::new();
    tokio::spawn(setup_signal_handlers(shutdown.clone()));

    match args.command {
        Command::Serve { .. } => {
            info!(gateway = %config.proxy.gateway_url, "Starting proxy");
            ProxyServer::new(config.proxy)?
                .run_with_shutdown(shutdown.signal())
                .await?;
        }
        Command::Watch {
            feed,
            channel,
            symbol,
            report_secs,
            ..
        } => {
            if report_secs == 0 {
                bail!("--report-secs must be greater than 0");
            }
            let watcher = Watcher::spawn(&config.channel, feed, channel.as_deref(), &symbol)?;
            watcher
                .run(shutdown, Duration::from_secs(report_secs))
                .await;
        }
    }

    info!("Brain server stopped");
    Ok(())
}

/// Loads the configuration file (defaults when absent), then applies
/// environment and command-line overrides.
fn load_config(args: &Args) -> anyhow::Result<ServerConfig> {
    let loader = ConfigLoader::new().with_env_prefix(ENV_PREFIX);

    let mut config: ServerConfig = if args.config.exists() {
        loader
            .load(&args.config)
            .with_context(|| format!("failed to load {}", args.config.display()))?
    } else {
        eprintln!(
            "Configuration file not found: {}, using defaults",
            args.config.display()
        );
        loader.with_validation(false).finish(ServerConfig::default())?
    };

    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    match &args.command {
        Command::Serve {
            host,
            port,
            gateway_url,
        } => {
            if let Some(host) = host {
                config.proxy.host.clone_from(host);
            }
            if let Some(port) = port {
                config.proxy.port = *port;
            }
            if let Some(url) = gateway_url {
                config.proxy.gateway_url.clone_from(url);
            }
        }
        Command::Watch { ws_url, .. } => {
            if let Some(url) = ws_url {
                config.channel.base_url.clone_from(url);
            }
        }
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}
