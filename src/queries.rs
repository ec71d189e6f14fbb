//! # Search Query Generation Module
//!
//! ## Purpose
//! Derives the ordered list of structured-field queries tried by the legacy
//! search path from one parsed citation. Order is significant: it defines
//! the priority in which the orchestrator tries them.
//!
//! ## Input/Output Specification
//! - **Input**: One `ParsedCitation`
//! - **Output**: A deterministic, ordered `Vec<CitationSearchQuery>`
//! - **Properties**: Pure; a query kind is emitted only when its source
//!   component was recognized by the parser

use crate::citation::ParsedCitation;
use serde::{Deserialize, Serialize};

/// One sparse filter record tried against the structured-query endpoint.
/// Created, tried, discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSearchQuery {
    /// Case name filter
    pub case_name: Option<String>,
    /// Combined `Volume Reporter Page` citation filter
    pub citation: Option<String>,
    /// Court filter
    pub court: Option<String>,
    /// Inclusive start of a decision-year window
    pub year_min: Option<i32>,
    /// Inclusive end of a decision-year window
    pub year_max: Option<i32>,
}

/// Generate the ordered structured-query list for a parsed citation:
/// 1. case-name query (whenever a case name exists);
/// 2. combined citation query (only for valid structured citations);
/// 3. court-scoped query (only when a court was recognized);
/// 4. ±1 year-window query (only when the year parses as an integer).
pub fn generate_queries(citation: &ParsedCitation) -> Vec<CitationSearchQuery> {
    let mut queries = Vec::new();

    if !citation.case_name.is_empty() {
        queries.push(CitationSearchQuery {
            case_name: Some(citation.case_name.clone()),
            ..Default::default()
        });
    }

    if citation.is_valid {
        queries.push(CitationSearchQuery {
            citation: Some(format!(
                "{} {} {}",
                citation.volume, citation.reporter, citation.page
            )),
            ..Default::default()
        });
    }

    if let Some(court) = &citation.court {
        queries.push(CitationSearchQuery {
            case_name: Some(citation.case_name.clone()),
            court: Some(court.clone()),
            ..Default::default()
        });
    }

    if let Some(year) = citation.year.as_deref().and_then(|y| y.parse::<i32>().ok()) {
        queries.push(CitationSearchQuery {
            case_name: Some(citation.case_name.clone()),
            year_min: Some(year - 1),
            year_max: Some(year + 1),
            ..Default::default()
        });
    }

    queries
}
