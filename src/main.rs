//! Binary entry point for dedupbot.
//!
//! Loads configuration, initializes logging and metrics, and runs the
//! selected command.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use dedupbot::config::BotConfig;
use dedupbot::observability::{self, InitOptions};
use dedupbot::{
    BotRunner, ContentKind, FingerprintGenerator, ImageFingerprintMode, MessagingGateway,
    SenderId, TelegramGateway, UpdateDispatcher,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Dedupbot - removes repeated messages from group chats.
#[derive(Parser)]
#[command(name = "dedupbot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, env = "DEDUPBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Poll for updates and remove duplicates (default).
    Run,

    /// Validate configuration and the bot token, then exit.
    Check,

    /// Print the fingerprint of a text message.
    Fingerprint {
        /// Sender user ID.
        #[arg(short, long)]
        sender: i64,

        /// Message text.
        text: String,
    },

    /// Print the fingerprint of an image file.
    FingerprintImage {
        /// Sender user ID.
        #[arg(short, long)]
        sender: i64,

        /// Image encoding: base64 or sha256.
        #[arg(short, long)]
        mode: Option<ImageFingerprintMode>,

        /// Path to the image.
        path: PathBuf,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match BotConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let telemetry = match observability::init_from_config(
        &config.observability,
        &InitOptions {
            log_level: cli.log_level.clone(),
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match &dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {},
        Err(e) => tracing::warn!(error = %e, "Failed to read .env file"),
    }
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    let command = cli.command.unwrap_or(Commands::Run);
    match run_command(command, config, telemetry.metrics_addr()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(
    command: Commands,
    config: BotConfig,
    metrics_addr: Option<SocketAddr>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run => cmd_run(config, metrics_addr).await,
        Commands::Check => cmd_check(config).await,
        Commands::Fingerprint { sender, text } => {
            cmd_fingerprint(&config, sender, ContentKind::Text(text));
            Ok(())
        },
        Commands::FingerprintImage { sender, mode, path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            let mut config = config;
            if let Some(mode) = mode {
                config.dedup.image_mode = mode;
            }
            cmd_fingerprint(&config, sender, ContentKind::Image(bytes));
            Ok(())
        },
    }
}

fn validated_gateway(config: &BotConfig) -> anyhow::Result<Arc<TelegramGateway>> {
    config.validate().context("invalid configuration")?;
    if config.token_looks_truncated() {
        tracing::warn!("TELEGRAM_BOT_TOKEN looks too short; check it was copied in full");
    }
    Ok(Arc::new(TelegramGateway::new(&config.telegram)?))
}

async fn cmd_run(config: BotConfig, metrics_addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let gateway = validated_gateway(&config)?;

    match gateway.get_me().await {
        Ok(identity) => {
            let actual = identity.username.unwrap_or_default();
            if actual != config.telegram.username {
                tracing::warn!(
                    configured = %config.telegram.username,
                    actual = %actual,
                    "Bot username differs from configuration"
                );
            }
        },
        Err(e) => tracing::warn!(error = %e, "Could not verify bot identity, continuing"),
    }

    let dispatcher = Arc::new(UpdateDispatcher::new(
        Arc::clone(&gateway) as Arc<dyn MessagingGateway>,
        &config.dedup,
    )?);
    let runner = BotRunner::new(gateway, dispatcher);

    tracing::info!(
        username = %config.telegram.username,
        max_history = config.dedup.max_history,
        image_mode = config.dedup.image_mode.as_str(),
        metrics = ?metrics_addr,
        "Bot started"
    );
    let dispatched = runner.run(shutdown_signal()).await;
    tracing::info!(dispatched, "Bot stopped");
    Ok(())
}

async fn cmd_check(config: BotConfig) -> anyhow::Result<()> {
    let gateway = validated_gateway(&config)?;
    let identity = gateway.get_me().await.context("token check failed")?;

    println!("Configuration OK");
    if let Some(source) = &config.source {
        println!("  Config file: {}", source.display());
    }
    println!("  Bot ID: {}", identity.id);
    println!(
        "  Username: {} (configured: {})",
        identity.username.as_deref().unwrap_or("<none>"),
        config.telegram.username
    );
    println!("  History size: {}", config.dedup.max_history);
    println!("  Image fingerprint: {}", config.dedup.image_mode.as_str());
    Ok(())
}

fn cmd_fingerprint(config: &BotConfig, sender: i64, content: ContentKind) {
    let generator = FingerprintGenerator::new(config.dedup.image_mode);
    println!("{}", generator.generate(SenderId::new(sender), &content));
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Cannot listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        },
    }
}
