//! Patrimonio Tracker CLI
//!
//! Runs the tracking server and talks to a running one.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod api_client;
mod commands;
mod config;
mod validator;

use api_client::{ApiClient, DetectionRequest, MovementView};
use commands::run_server;
use config::AppConfig;
use validator::ConfigValidator;

const DEFAULT_CONFIG_PATH: &str = "config/patrimonio.yaml";

#[derive(Parser)]
#[command(name = "patrimonio")]
#[command(version)]
#[command(about = "Asset location tracking from boundary sensor detections", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "PATRIMONIO_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// API server URL (for remote commands)
    #[arg(long, default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Database URL (sqlite:// or postgres://)
        #[arg(short, long, env = "DATABASE_URL")]
        database: Option<String>,

        /// Do not serve the OpenAPI document
        #[arg(long)]
        no_openapi: bool,

        /// Validate configuration and exit without starting the server
        #[arg(long)]
        validate_only: bool,
    },

    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config,

    /// Send a detection to a running server
    Detect {
        /// Reporting sensor ID
        #[arg(short, long)]
        sensor: Uuid,

        /// External tag of the detected asset
        #[arg(short, long)]
        tag: String,

        /// Detection time (RFC 3339). Defaults to the server's clock.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Show an asset's movement history
    History {
        /// Asset ID
        asset_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load_or_default(&config_path).unwrap_or_else(|e| {
        eprintln!("{} {:#}", "Ignoring configuration file:".yellow(), e);
        AppConfig::default()
    });

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Serve {
            port,
            host,
            database,
            no_openapi,
            validate_only,
        } => {
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(database) = database {
                config.database.url = database;
            }
            if no_openapi {
                config.server.enable_openapi = false;
            }
            cmd_serve(config, validate_only).await
        }
        Commands::Validate { config: cfg_path } => {
            cmd_validate(&cfg_path.unwrap_or(config_path)).await
        }
        Commands::Config => cmd_config(&config, cli.format).await,
        Commands::Detect { sensor, tag, at } => {
            cmd_detect(&cli.api_url, sensor, tag, at, cli.format).await
        }
        Commands::History { asset_id } => cmd_history(&cli.api_url, asset_id, cli.format).await,
    }
}

fn init_logging(config: &AppConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    // An invalid level is reported by the validator; log at the default meanwhile.
    let logging =
        pt_observability::LoggingConfig::from_level_str(level, config.logging.json_format)
            .unwrap_or_default();
    pt_observability::init_logging_with_config(logging);
}

async fn cmd_serve(config: AppConfig, validate_only: bool) -> Result<()> {
    println!("{}", "Validating configuration...".cyan());

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Server startup aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    if validate_only {
        println!();
        println!(
            "{}",
            "Configuration is valid. Server can be started."
                .green()
                .bold()
        );
        return Ok(());
    }

    println!();
    run_server(config).await
}

async fn cmd_validate(config_path: &Path) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    let config = match AppConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("{}: {:#}", "Configuration file error".red().bold(), e);
            std::process::exit(1);
        }
    };

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.database.url);
    println!("  Mismatch policy: {}", config.tracking.mismatch_policy);
    println!("  Max retries: {}", config.tracking.retry.max_retries);

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Configuration validation failed. Fix the errors above."
                .red()
                .bold()
        );
        std::process::exit(1);
    } else if validation_result.has_warnings() {
        println!();
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!();
        println!("{}", "Configuration is valid.".green().bold());
    }

    Ok(())
}

async fn cmd_config(config: &AppConfig, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        print!("{}", serde_yaml::to_string(config)?);
    }

    Ok(())
}

async fn cmd_detect(
    api_url: &str,
    sensor_id: Uuid,
    tag: String,
    detected_at: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> Result<()> {
    let client = ApiClient::new(api_url)?;
    let movement = client
        .post_detection(&DetectionRequest {
            sensor_id,
            tag,
            detected_at,
        })
        .await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&movement)?);
    } else {
        println!("{}", "Movement recorded".green().bold());
        print_movement(&movement);
    }

    Ok(())
}

async fn cmd_history(api_url: &str, asset_id: Uuid, format: OutputFormat) -> Result<()> {
    let client = ApiClient::new(api_url)?;
    let asset = client.get_asset(asset_id).await?;
    let history = client.asset_history(asset_id).await?;

    if format == OutputFormat::Json {
        let body = serde_json::json!({ "asset": asset, "movements": history });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Asset".bold(),
        asset.name.bold(),
        asset.external_tag
    );
    println!("  Current location: {}", asset.current_location_id);
    println!("  Last seen: {}", asset.last_seen_at.to_rfc3339());
    println!("  Version: {}", asset.version);
    println!();

    if history.is_empty() {
        println!("No movements recorded");
    } else {
        println!("{} ({})", "Movements".bold(), history.len());
        println!("─────────");
        for movement in &history {
            print_movement(movement);
        }
    }

    Ok(())
}

fn print_movement(movement: &MovementView) {
    let status = match movement.status.as_str() {
        "suspicious" => movement.status.yellow(),
        _ => movement.status.green(),
    };
    println!(
        "  {} {} → {} via sensor {} [{}, {}]",
        movement.occurred_at.to_rfc3339(),
        movement.from_location_id,
        movement.to_location_id,
        movement.sensor_id,
        movement.kind,
        status
    );
}
