//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the citation search service,
//! supporting TOML files and environment variables with validation and
//! type-safe access to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation, dependency verification
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)
//!
//! ## Usage
//! ```rust,no_run
//! use citation_search::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Server port: {}", config.server.port);
//! ```

use crate::errors::{Result, SearchError};
use crate::search::SearchMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// CourtListener client settings
    pub courtlistener: CourtListenerConfig,
    /// Search cascade behavior
    pub search: SearchConfig,
    /// Logging and monitoring
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of HTTP worker threads
    pub workers: usize,
    /// Enable CORS
    pub enable_cors: bool,
}

/// CourtListener client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtListenerConfig {
    /// API base URL
    pub api_url: String,
    /// API token for authentication (sent as `Authorization: Token <value>`)
    pub api_token: Option<String>,
    /// User-Agent identifying this service to the upstream API
    pub user_agent: String,
    /// Minimum interval between any two outbound requests (ms),
    /// measured from the end of the previous request
    pub min_request_interval_ms: u64,
    /// Retry ceiling for throttled (429/403) responses
    pub retry_attempts: u32,
    /// Per-request HTTP timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum results requested per upstream query
    pub page_size: usize,
}

/// Search cascade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default search mode when a request does not specify one
    pub default_mode: SearchMode,
    /// Default maximum number of documents returned to API callers
    pub default_max_results: usize,
    /// Overall deadline for one search cascade in milliseconds
    pub deadline_ms: u64,
    /// Minimum citation length accepted by the API
    pub min_citation_length: usize,
    /// Maximum citation length accepted by the API
    pub max_citation_length: usize,
    /// How many text-less documents the legacy path hydrates with opinion text
    pub max_opinion_fetches: usize,
}

/// Logging and monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| SearchError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| SearchError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        // Apply environment variable overrides
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // Server configuration
        if let Ok(host) = std::env::var("CITATION_SEARCH_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CITATION_SEARCH_PORT") {
            self.server.port = port.parse().map_err(|_| SearchError::Config {
                message: "Invalid port number in CITATION_SEARCH_PORT".to_string(),
            })?;
        }

        // CourtListener configuration
        if let Ok(url) = std::env::var("CITATION_SEARCH_CL_API_URL") {
            self.courtlistener.api_url = url;
        }
        if let Ok(token) = std::env::var("CITATION_SEARCH_CL_TOKEN") {
            if !token.is_empty() {
                self.courtlistener.api_token = Some(token);
            }
        }

        // Logging
        if let Ok(level) = std::env::var("CITATION_SEARCH_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SearchError::ValidationFailed {
                field: "server.port".to_string(),
                reason: "Port cannot be zero".to_string(),
            });
        }

        if self.server.workers == 0 {
            return Err(SearchError::ValidationFailed {
                field: "server.workers".to_string(),
                reason: "Worker count cannot be zero".to_string(),
            });
        }

        if self.courtlistener.api_url.is_empty() {
            return Err(SearchError::ValidationFailed {
                field: "courtlistener.api_url".to_string(),
                reason: "API URL cannot be empty".to_string(),
            });
        }

        if self.courtlistener.retry_attempts > 10 {
            return Err(SearchError::ValidationFailed {
                field: "courtlistener.retry_attempts".to_string(),
                reason: "Retry ceiling above 10 would stall searches for minutes".to_string(),
            });
        }

        if self.courtlistener.page_size == 0 {
            return Err(SearchError::ValidationFailed {
                field: "courtlistener.page_size".to_string(),
                reason: "Page size cannot be zero".to_string(),
            });
        }

        if self.search.min_citation_length > self.search.max_citation_length {
            return Err(SearchError::ValidationFailed {
                field: "search.min_citation_length".to_string(),
                reason: "Minimum citation length cannot be greater than maximum".to_string(),
            });
        }

        if self.search.deadline_ms == 0 {
            return Err(SearchError::ValidationFailed {
                field: "search.deadline_ms".to_string(),
                reason: "Search deadline cannot be zero".to_string(),
            });
        }

        Ok(())
    }

    /// The overall cascade deadline as a `Duration`
    pub fn search_deadline(&self) -> Duration {
        Duration::from_millis(self.search.deadline_ms)
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SearchError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: num_cpus::get(),
                enable_cors: true,
            },
            courtlistener: CourtListenerConfig {
                api_url: "https://www.courtlistener.com/api/rest/v4".to_string(),
                api_token: None,
                user_agent: "citation-search/0.1 (case-law research service)".to_string(),
                min_request_interval_ms: 1000,
                retry_attempts: 3,
                timeout_seconds: 30,
                page_size: 20,
            },
            search: SearchConfig {
                default_mode: SearchMode::Exact,
                default_max_results: 10,
                deadline_ms: 30_000,
                min_citation_length: 2,
                max_citation_length: 512,
                max_opinion_fetches: 3,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}
