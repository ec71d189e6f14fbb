//! # Citation Parsing Module
//!
//! ## Purpose
//! Converts free-text legal citations (e.g. `"Miller v. McDonald, 944 F.3d
//! 1050 (9th Cir. 2019)"`) into structured records suitable for building
//! search queries.
//!
//! ## Input/Output Specification
//! - **Input**: One free-text citation string
//! - **Output**: A `ParsedCitation` with case name, volume, reporter, page,
//!   optional court/year, and a validity flag
//! - **Guarantee**: Parsing never fails; unrecognized inputs degrade to a
//!   best-effort case name with `is_valid = false`
//!
//! ## Key Features
//! - Four progressively looser surface patterns, first match wins
//! - Unicode normalization and whitespace collapsing before matching
//! - Verbatim preservation of the trimmed input for re-display

use crate::errors::{Result, SearchError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Structured components of one legal citation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCitation {
    /// The party-vs-party portion; falls back to the whole input
    pub case_name: String,
    /// Reporter abbreviation (e.g. "F.3d"), empty when unrecognized
    pub reporter: String,
    /// Reporter volume, empty when unrecognized
    pub volume: String,
    /// First page, empty when unrecognized
    pub page: String,
    /// Decision year from the parenthetical, when present
    pub year: Option<String>,
    /// Deciding court from the parenthetical, when present
    pub court: Option<String>,
    /// Original trimmed input, preserved verbatim
    pub full_citation: String,
    /// True only if one of the structured patterns matched
    pub is_valid: bool,
}

/// Citation parser holding the compiled surface patterns
pub struct CitationParser {
    patterns: Vec<Regex>,
    whitespace: Regex,
}

// Reporter abbreviations mix letters, dots, ordinal digits and internal
// spaces ("F. Supp. 2d", "Cal. App. 4th"); the lazy quantifier stops at the
// page number thanks to the end anchor.
const REPORTER: &str = r"[A-Za-z][A-Za-z0-9.\s]*?";

impl CitationParser {
    /// Create a new parser with the fixed surface patterns compiled
    pub fn new() -> Result<Self> {
        // Tried in order, loosest last:
        // 1. Name, Vol Reporter Page (Court Year)
        // 2. Name, Vol Reporter Page (Year)
        // 3. Name, Vol Reporter Page
        // 4. Name Vol Reporter Page  (no comma)
        let sources = [
            format!(
                r"^(?P<name>.+?),\s*(?P<vol>\d+)\s+(?P<rep>{REPORTER})\s+(?P<page>\d+)\s*\(\s*(?P<court>[^)]+?)\s+(?P<year>\d{{4}})\s*\)$"
            ),
            format!(
                r"^(?P<name>.+?),\s*(?P<vol>\d+)\s+(?P<rep>{REPORTER})\s+(?P<page>\d+)\s*\(\s*(?P<year>\d{{4}})\s*\)$"
            ),
            format!(
                r"^(?P<name>.+?),\s*(?P<vol>\d+)\s+(?P<rep>{REPORTER})\s+(?P<page>\d+)$"
            ),
            format!(
                r"^(?P<name>[^,\d]+?)\s+(?P<vol>\d+)\s+(?P<rep>{REPORTER})\s+(?P<page>\d+)$"
            ),
        ];

        let mut patterns = Vec::with_capacity(sources.len());
        for source in &sources {
            patterns.push(Regex::new(source).map_err(|e| SearchError::Internal {
                message: format!("Invalid citation pattern: {}", e),
            })?);
        }

        let whitespace = Regex::new(r"\s+").map_err(|e| SearchError::Internal {
            message: format!("Invalid whitespace pattern: {}", e),
        })?;

        Ok(Self {
            patterns,
            whitespace,
        })
    }

    /// Parse a free-text citation. Never fails; returns a best-effort
    /// structure with `is_valid = false` when no pattern matched.
    pub fn parse(&self, input: &str) -> ParsedCitation {
        let trimmed = input.trim();

        // Patterns match against an NFC-normalized, whitespace-collapsed
        // copy; `full_citation` keeps the trimmed original.
        let normalized: String = trimmed.nfc().collect();
        let normalized = self.whitespace.replace_all(&normalized, " ");

        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(&normalized) {
                return ParsedCitation {
                    case_name: caps["name"].trim().to_string(),
                    volume: caps["vol"].to_string(),
                    reporter: caps["rep"].trim().to_string(),
                    page: caps["page"].to_string(),
                    year: caps.name("year").map(|m| m.as_str().to_string()),
                    court: caps.name("court").map(|m| m.as_str().trim().to_string()),
                    full_citation: trimmed.to_string(),
                    is_valid: true,
                };
            }
        }

        self.fallback(trimmed)
    }

    /// Unstructured fallback: everything before the first comma or digit
    /// becomes the case name; the whole input when no boundary exists or the
    /// prefix is empty.
    fn fallback(&self, trimmed: &str) -> ParsedCitation {
        let comma = trimmed.find(',');
        let digit = trimmed.find(|c: char| c.is_ascii_digit());
        let boundary = match (comma, digit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };

        let case_name = match boundary {
            Some(idx) => {
                let prefix = trimmed[..idx].trim();
                if prefix.is_empty() {
                    trimmed.to_string()
                } else {
                    prefix.to_string()
                }
            }
            None => trimmed.to_string(),
        };

        ParsedCitation {
            case_name,
            volume: String::new(),
            reporter: String::new(),
            page: String::new(),
            year: None,
            court: None,
            full_citation: trimmed.to_string(),
            is_valid: false,
        }
    }
}
