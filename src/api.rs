//! # API Server Module
//!
//! ## Purpose
//! REST API server exposing citation search, health and statistics
//! endpoints backed by the shared search engine and CourtListener client.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with citations, search mode, result limits
//! - **Output**: JSON responses with normalized documents, advisory errors,
//!   system status
//! - **Endpoints**: Search, health, stats, index
//!
//! ## Key Features
//! - Request validation with structured error responses
//! - CORS support for web frontends
//! - Per-request timing and request ids for log correlation

use crate::errors::SearchError;
use crate::search::{SearchMode, SearchOutcome};
use crate::utils::Timer;
use crate::{AppState, CaseDocument, Deadline, ParsedCitation};
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// API server wrapping the shared application state
pub struct ApiServer {
    app_state: AppState,
}

/// Search request payload
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Free-text citation to search for
    pub citation: String,
    /// Search mode; the configured default applies when absent
    pub mode: Option<SearchMode>,
    /// Cap on the number of returned documents
    pub max_results: Option<usize>,
}

/// Search response payload
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Request id for log correlation
    pub request_id: Uuid,
    /// Structured interpretation of the citation input
    pub parsed: ParsedCitation,
    /// Normalized documents
    pub documents: Vec<CaseDocument>,
    /// Upstream total before the result cap
    pub total_found: usize,
    /// Advisory messages (stage failures, broadening caveats, not-found)
    pub errors: Vec<String>,
    /// Wall-clock search duration
    pub query_time_ms: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: HealthComponents,
}

/// Component health status
#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub courtlistener: crate::courtlistener::SourceHealth,
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server
    pub async fn run(self) -> crate::Result<()> {
        let config = self.app_state.config.clone();
        let bind_addr = format!("{}:{}", config.server.host, config.server.port);
        let enable_cors = config.server.enable_cors;
        let app_state = self.app_state.clone();

        tracing::info!("Starting API server on {}", bind_addr);

        let server = HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };
            App::new()
                .wrap(cors)
                .app_data(web::Data::new(app_state.clone()))
                .route("/search", web::post().to(search_handler))
                .route("/health", web::get().to(health_handler))
                .route("/stats", web::get().to(stats_handler))
                .route("/", web::get().to(index_handler))
        })
        .workers(config.server.workers)
        .bind(&bind_addr)
        .map_err(|e| SearchError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| SearchError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Search endpoint handler
async fn search_handler(
    app_state: web::Data<AppState>,
    request: web::Json<SearchRequest>,
) -> ActixResult<HttpResponse> {
    let request_id = Uuid::new_v4();
    let timer = Timer::new("search request");

    // Validate input before burning rate-limited upstream calls
    if let Err(e) = app_state.engine.validate(&request.citation) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Invalid citation",
            "message": e.to_string(),
        })));
    }

    let mode = request.mode.unwrap_or(app_state.config.search.default_mode);
    let parsed = app_state.engine.parse(&request.citation);

    tracing::info!(
        request_id = %request_id,
        citation = request.citation.as_str(),
        ?mode,
        "Search request received"
    );

    let outcome: SearchOutcome = app_state.engine.search(&request.citation, mode).await;

    let max_results = request
        .max_results
        .unwrap_or(app_state.config.search.default_max_results);
    let mut documents = outcome.documents;
    documents.truncate(max_results);

    let response = SearchResponse {
        request_id,
        parsed,
        documents,
        total_found: outcome.total_found,
        errors: outcome.errors,
        query_time_ms: timer.stop(),
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Health check endpoint handler
async fn health_handler(app_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    // One throttled probe against the upstream API
    let deadline = Deadline::after(Duration::from_secs(10));
    let courtlistener = app_state.client.health_check(&deadline).await;

    let status = if courtlistener.is_healthy {
        "healthy"
    } else {
        "unhealthy"
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents { courtlistener },
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Statistics endpoint handler
async fn stats_handler(app_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let client_stats = app_state.client.stats().await;

    let response = serde_json::json!({
        "courtlistener": client_stats,
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Index page handler
async fn index_handler() -> ActixResult<HttpResponse> {
    let html = r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Citation Search</title>
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .header { color: #2c3e50; }
            .endpoint { margin: 20px 0; padding: 15px; background: #f8f9fa; border-radius: 5px; }
            .method { font-weight: bold; color: #27ae60; }
        </style>
    </head>
    <body>
        <h1 class="header">Citation Search API</h1>
        <p>Turns free-text U.S. legal citations into normalized case documents from CourtListener.</p>

        <h2>Available Endpoints</h2>

        <div class="endpoint">
            <span class="method">POST</span> /search
            <p>Search for case documents by citation.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /health
            <p>Check the health of the service and the upstream API.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /stats
            <p>Process-wide upstream request statistics.</p>
        </div>

        <h2>Example Search Request</h2>
        <pre>{
  "citation": "Miller v. McDonald, 944 F.3d 1050 (9th Cir. 2019)",
  "mode": "related",
  "max_results": 10
}</pre>
    </body>
    </html>
    "#;

    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}
