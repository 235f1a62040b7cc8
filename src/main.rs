//! Konya Water - household water-usage tracking and advice
//!
//! Serves the HTTP API and offers a few one-shot commands against the same
//! gateway for inspecting data from the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use konya_water::{
    api::{build_app, AppState},
    config::{AppConfig, StoreBackend},
    models::{FamilySettings, UsageRecord},
    DataGateway,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "konya-water")]
#[command(author = "Konya Water Team")]
#[command(version)]
#[command(about = "Resilient data gateway for household water-usage tracking")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "KONYA_WATER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Use the in-memory store instead of the configured backend
        #[arg(long)]
        memory: bool,
    },

    /// Analyze a usage record read from a JSON file
    Analyze {
        /// Path to the usage record
        file: PathBuf,
    },

    /// Show the current reservoir snapshot
    Reservoirs,

    /// List a user's most recent usage records
    History {
        /// User id
        user: String,
    },

    /// Replace a user's household settings from a JSON file
    Settings {
        /// User id
        user: String,

        /// Path to the settings document
        file: PathBuf,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port, memory } => {
            run_server(config, host, port, memory).await?;
        }
        Commands::Analyze { file } => {
            let record: UsageRecord = read_json(&file)?;
            record.validate()?;
            let gateway = DataGateway::from_config(&config);
            print_json(&gateway.analyze_usage(&record).await)?;
        }
        Commands::Reservoirs => {
            let gateway = DataGateway::from_config(&config);
            print_json(&gateway.get_reservoir_status().await)?;
        }
        Commands::History { user } => {
            let gateway = DataGateway::from_config(&config);
            let records = gateway.recent_usage_records(&user).await;
            if records.is_empty() {
                println!("No usage records for {}", user);
            } else {
                print_json(&records)?;
            }
        }
        Commands::Settings { user, file } => {
            let settings: FamilySettings = read_json(&file)?;
            let gateway = DataGateway::from_config(&config);
            gateway.upsert_family_settings(&user, &settings).await;
            println!("Settings submitted for {}", user);
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("konya_water={},tower_http=debug", log_level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn run_server(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
    memory: bool,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if memory {
        config.store.backend = StoreBackend::Memory;
    }

    tracing::info!(
        backend = ?config.store.backend,
        analysis = config.analysis.enabled,
        "Starting Konya Water"
    );

    let gateway = Arc::new(DataGateway::from_config(&config));

    let handle = gateway.handle().clone();
    tokio::spawn(async move { handle.initialize().await });

    let app = build_app(
        AppState {
            gateway,
            default_user_id: config.gateway.default_user_id.clone(),
        },
        &config.server.cors_origins,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Konya Water is listening on {}. Press Ctrl+C to stop.", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_config(config: Option<&AppConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
