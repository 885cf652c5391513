//! arn-gateway: HTTP gateway for an ERC-8004 agent registry.
//!
//! ```bash
//! # Serve the HTTP API (default command)
//! arn-gateway serve
//!
//! # Parse an identifier and print its components
//! arn-gateway parse did:8004:11155111:42
//!
//! # Inspect or change persisted settings
//! arn-gateway config list
//! arn-gateway config set server.port 8080
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arn_gateway::api::{self, AppState};
use arn_gateway::config::Config;
use arn_gateway::did::IdentifierParser;
use arn_gateway::settings::Settings;
use arn_gateway::upstream::HttpUpstream;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arn-gateway", version, about = "ERC-8004 agent registry gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (default: ~/.arn-gateway/settings.json)
    #[arg(long, global = true, env = "ARN_SETTINGS_PATH")]
    settings: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "ARN_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve,

    /// Parse a did:ethr, did:8004 or did:ens literal and print it as JSON
    Parse {
        /// Identifier literal (percent-encoding is accepted)
        literal: String,
    },

    /// Manage persisted settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// List all settings
    List,
    /// Print one setting by dotted path
    Get { path: String },
    /// Set one setting by dotted path
    Set { path: String, value: String },
    /// Restore one setting to its default
    Reset { path: String },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arn_gateway=info,tower_http=info"));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let settings_path = cli.settings.unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load_from(&settings_path);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&settings).await,
        Commands::Parse { literal } => {
            let config = Config::resolve(&settings)?;
            let literal = arn_gateway::did::params::decode_literal(&literal)?;
            let identifier = config.identifiers.parser().parse(&literal)?;
            println!("{}", serde_json::to_string_pretty(&identifier)?);
            Ok(())
        }
        Commands::Config(command) => {
            match command {
                ConfigCommand::List => {
                    for (path, value) in settings.list() {
                        println!("{path} = {value}");
                    }
                    return Ok(());
                }
                ConfigCommand::Get { path } => {
                    let value = settings
                        .get(&path)
                        .with_context(|| format!("Unknown setting: {path}"))?;
                    println!("{value}");
                    return Ok(());
                }
                ConfigCommand::Set { path, value } => {
                    settings.set(&path, &value).map_err(anyhow::Error::msg)?
                }
                ConfigCommand::Reset { path } => {
                    settings.reset(&path).map_err(anyhow::Error::msg)?
                }
            }
            settings
                .save_to(&settings_path)
                .with_context(|| format!("writing {}", settings_path.display()))?;
            tracing::info!("Saved settings to {}", settings_path.display());
            Ok(())
        }
    }
}

async fn serve(settings: &Settings) -> Result<()> {
    let config = Config::resolve(settings)?;
    let parser: IdentifierParser = config.identifiers.parser();

    let upstream = Arc::new(
        HttpUpstream::new(&config.upstream).context("building upstream client")?,
    );
    let mut state = AppState::new(parser, upstream.clone(), upstream.clone(), upstream);
    if let Some(path) = &config.session_package_path {
        state = state.with_session_package(path);
    }

    let (host, port) = config.http.bind_target();
    tracing::info!(
        host,
        port,
        upstream = %config.upstream.base_url,
        default_chain_id = %config.identifiers.default_chain_id,
        "Starting arn-gateway"
    );

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}
