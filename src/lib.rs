//! # Citation-Driven Case-Law Search Service
//!
//! ## Overview
//! This library turns free-text U.S. legal citations (e.g.
//! `"Miller v. McDonald, 944 F.3d 1050 (9th Cir. 2019)"`) into normalized
//! case documents retrieved from the CourtListener legal-research API.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `citation`: Regex-based parsing of citation strings into structured records
//! - `queries`: Derivation of ranked structured-field queries from a parsed citation
//! - `courtlistener`: Typed API shapes, rate-limited HTTP client, response normalizer
//! - `search`: Multi-strategy search cascade orchestrating the CourtListener endpoints
//! - `api`: REST API endpoints
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Free-text legal citations, search mode (exact/related/comprehensive)
//! - **Output**: Normalized `CaseDocument` records plus advisory error messages
//! - **Behavior**: Progressively-relaxed approximate matching; a search never
//!   fails outright, it degrades to fewer (or zero) results with explanations
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use citation_search::{Config, CitationSearchEngine, SearchMode};
//! use citation_search::courtlistener::CourtListenerClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_file("config.toml")?);
//!     let client = Arc::new(CourtListenerClient::new(&config.courtlistener)?);
//!     let engine = CitationSearchEngine::new(config, client)?;
//!     let outcome = engine.search("410 U.S. 113", SearchMode::Exact).await;
//!     println!("Found {} documents", outcome.documents.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod citation;
pub mod config;
pub mod courtlistener;
pub mod errors;
pub mod queries;
pub mod search;
pub mod api;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use citation::{CitationParser, ParsedCitation};
pub use config::Config;
pub use errors::{Result, SearchError};
pub use queries::CitationSearchQuery;
pub use search::{CitationSearchEngine, SearchMode, SearchOutcome};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Provenance of a normalized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentSource {
    #[serde(rename = "courtlistener")]
    CourtListener,
}

/// Kinds of documents a case search can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Decision,
    Dissent,
    Concurrence,
    Record,
    BriefPetitioner,
    BriefRespondent,
    BriefAmicus,
}

/// Document classification with an explicit confidence state.
///
/// Upstream metadata rarely disambiguates opinion kinds; instead of silently
/// defaulting to `Decision`, the classification records whether the kind came
/// from provenance metadata (`Known`), a heuristic (`BestGuess`), or could
/// not be determined at all (`Unknown`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "confidence", content = "kind", rename_all = "snake_case")]
pub enum DocumentClass {
    Known(DocumentType),
    BestGuess(DocumentType),
    Unknown,
}

impl DocumentClass {
    /// The underlying document kind, regardless of confidence.
    pub fn kind(&self) -> Option<DocumentType> {
        match self {
            DocumentClass::Known(kind) | DocumentClass::BestGuess(kind) => Some(*kind),
            DocumentClass::Unknown => None,
        }
    }
}

/// The normalized unit returned to callers.
///
/// Every document is traceable to exactly one upstream cluster/opinion pair;
/// the normalizer synthesizes a usable record even when that pair's data is
/// incomplete, so display fields may be empty/zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDocument {
    /// Synthesized identifier, prefixed by source and internal identifiers
    pub id: String,
    /// Document classification with confidence state
    pub doc_type: DocumentClass,
    /// Case title as reported upstream
    pub title: String,
    /// Deciding court (upstream value, or inferred from reporter abbreviations)
    pub court: String,
    /// Docket number, empty when unknown
    pub docket_number: String,
    /// Filing/decision date as reported (ISO-8601 string), empty when unknown
    pub date: String,
    /// Page count, zero when unknown
    pub page_count: u32,
    /// Provenance tag
    pub source: DocumentSource,
    /// Download URL when the upstream response carried one
    pub download_url: Option<String>,
    /// Plain text body or snippet when available
    pub plain_text: Option<String>,
    /// Opinion authors / judges when available
    pub authors: Vec<String>,
    /// UI-local selection state, not part of the upstream source of truth
    pub is_selected: bool,
}

/// A time budget propagated through every call of a search cascade.
///
/// A slow upstream stage consumes the remaining budget rather than stalling
/// the whole search indefinitely.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start a new deadline expiring after `budget`.
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Remaining time, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    /// Whether the budget is exhausted.
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Milliseconds elapsed since the deadline started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Application state shared across components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub engine: Arc<search::CitationSearchEngine>,
    pub client: Arc<courtlistener::CourtListenerClient>,
}
