//! # Citation Search Server Main Driver
//!
//! ## Purpose
//! Main entry point for the citation search server. Initializes the shared
//! CourtListener client and search engine and starts the web server.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files, command line arguments, environment variables
//! - **Output**: Running web server with search API endpoints
//! - **Initialization**: Loads configuration, constructs shared components, health checks
//!
//! ## Key Features
//! - Graceful startup and shutdown
//! - One process-wide client: throttle state is created here once and shared
//!   by reference for the lifetime of the process
//! - Configuration validation
//! - Structured logging
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Construct the shared CourtListener client and search engine
//! 4. Start the web API server
//! 5. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use citation_search::{
    api::ApiServer,
    config::Config,
    courtlistener::CourtListenerClient,
    errors::{Result, SearchError},
    search::CitationSearchEngine,
    AppState, Deadline,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("citation-search-server")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Legal Search Team")
        .about("Citation-driven case-law search service backed by the CourtListener API")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Probe the upstream API and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration
    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)?;

    // Override port if specified
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);

    // Initialize logging
    init_logging(&config)?;

    info!("Starting Citation Search v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", config_path);
    if config.courtlistener.api_token.is_none() {
        warn!("No CourtListener API token configured; anonymous rate limits apply");
    }

    // Run a one-shot upstream probe if requested
    if matches.get_flag("check-health") {
        return run_health_check(&config).await;
    }

    // Initialize application components
    let app_state = initialize_components(config.clone())?;

    // Start the API server
    let server = ApiServer::new(app_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    info!(
        "Citation Search started successfully on {}:{}",
        config.server.host, config.server.port
    );

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = server_handle => {
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Citation Search shut down successfully");
    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config
            .logging
            .level
            .parse()
            .map_err(|_| SearchError::Config {
                message: format!("Invalid log level: {}", config.logging.level),
            })?;

    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_target(true)
            .with_max_level(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_max_level(filter)
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
    Ok(())
}

/// Construct the shared components.
///
/// The CourtListener client is built exactly once per process; its throttle
/// and statistics travel behind `Arc`, so every concurrent request shares
/// the same outbound rate limit.
fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("Initializing application components...");

    let client = Arc::new(CourtListenerClient::new(&config.courtlistener)?);
    let engine = Arc::new(CitationSearchEngine::new(config.clone(), client.clone())?);

    info!("All components initialized successfully");
    Ok(AppState {
        config,
        engine,
        client,
    })
}

/// Probe the upstream API once and report the result
async fn run_health_check(config: &Config) -> Result<()> {
    info!("Probing CourtListener at {}", config.courtlistener.api_url);

    let client = CourtListenerClient::new(&config.courtlistener)?;
    let deadline = Deadline::after(Duration::from_secs(10));
    let health = client.health_check(&deadline).await;

    println!("{}", serde_json::to_string_pretty(&health)?);

    if health.is_healthy {
        info!("Upstream API is reachable");
        Ok(())
    } else {
        Err(SearchError::Network {
            operation: "health check".to_string(),
            details: health
                .error_message
                .unwrap_or_else(|| "unknown failure".to_string()),
        })
    }
}
