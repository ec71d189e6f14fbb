//! # Search Orchestration Module
//!
//! ## Purpose
//! Main search engine driving the multi-strategy cascade against the
//! CourtListener API: modern full-text search, dedicated citation lookup,
//! legacy structured-field queries, and a broadened fallback, in that fixed
//! order.
//!
//! ## Input/Output Specification
//! - **Input**: Free-text citation, search mode (exact/related/comprehensive)
//! - **Output**: A `SearchOutcome` with normalized documents, a total count,
//!   and advisory error strings. Never an `Err` to the caller.
//! - **Strategy**: Progressively-relaxed approximate matching; each stage's
//!   absence of results is the signal to proceed to the next
//!
//! ## Key Features
//! - Strict short-circuit: the first stage yielding documents wins
//! - Per-stage failures are accumulated as strings, never raised
//! - Sequential execution by design: parallel fan-out would waste calls
//!   against a rate-limited third party
//! - Deadline propagation bounds the whole cascade

use crate::citation::{CitationParser, ParsedCitation};
use crate::config::Config;
use crate::courtlistener::normalize::{
    classify_opinion_type, normalize_cluster, normalize_lookup_match, normalize_v4_hit,
};
use crate::courtlistener::CourtListenerClient;
use crate::errors::{Result, SearchError};
use crate::queries::{generate_queries, CitationSearchQuery};
use crate::{CaseDocument, Deadline, DocumentClass, DocumentType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// How aggressively the full-text stage relaxes its query variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Quoted/strict variants only
    Exact,
    /// Adds party-name and same-court variants
    Related,
    /// Unions all variant families
    Comprehensive,
}

/// Terminal result of one search cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Normalized documents from the first stage that produced any
    pub documents: Vec<CaseDocument>,
    /// Upstream total when reported, otherwise the document count
    pub total_found: usize,
    /// Advisory messages: per-stage failures, broadening caveats, not-found
    pub errors: Vec<String>,
}

/// Main search engine
pub struct CitationSearchEngine {
    config: Arc<Config>,
    client: Arc<CourtListenerClient>,
    parser: CitationParser,
}

impl CitationSearchEngine {
    /// Create a new engine sharing the process-wide client
    pub fn new(config: Arc<Config>, client: Arc<CourtListenerClient>) -> Result<Self> {
        Ok(Self {
            config,
            client,
            parser: CitationParser::new()?,
        })
    }

    /// Parse a citation without searching (used by the API layer to echo
    /// the structured interpretation back to callers)
    pub fn parse(&self, input: &str) -> ParsedCitation {
        self.parser.parse(input)
    }

    /// Validate raw search input against the configured length bounds
    pub fn validate(&self, citation: &str) -> Result<()> {
        let trimmed = citation.trim();
        if trimmed.len() < self.config.search.min_citation_length {
            return Err(SearchError::InvalidSearchQuery {
                query: citation.to_string(),
                reason: format!(
                    "Citation too short: minimum {} characters",
                    self.config.search.min_citation_length
                ),
            });
        }
        if trimmed.len() > self.config.search.max_citation_length {
            return Err(SearchError::InvalidSearchQuery {
                query: citation.to_string(),
                reason: format!(
                    "Citation too long: maximum {} characters",
                    self.config.search.max_citation_length
                ),
            });
        }
        Ok(())
    }

    /// Run the full cascade for a free-text citation. Never fails; all
    /// stage failures are accumulated in the outcome's `errors`.
    pub async fn search(&self, citation_text: &str, mode: SearchMode) -> SearchOutcome {
        let deadline = Deadline::after(self.config.search_deadline());
        let parsed = self.parser.parse(citation_text);
        debug!(
            citation = citation_text,
            is_valid = parsed.is_valid,
            ?mode,
            "Starting search cascade"
        );
        self.search_parsed(&parsed, mode, &deadline).await
    }

    /// Cascade body, strictly ordered, short-circuiting on first results
    async fn search_parsed(
        &self,
        parsed: &ParsedCitation,
        mode: SearchMode,
        deadline: &Deadline,
    ) -> SearchOutcome {
        let mut errors = Vec::new();

        // 1. Full-text search against the modern endpoint
        match self.fulltext_stage(parsed, mode, deadline).await {
            Ok(Some((documents, total_found))) => {
                return SearchOutcome {
                    documents,
                    total_found,
                    errors,
                }
            }
            Ok(None) => debug!("Full-text stage produced no results"),
            Err(e) => {
                warn!(error = %e, "Full-text stage abandoned");
                errors.push(format!("Full-text search failed: {}", e));
            }
        }

        // 2. Dedicated citation lookup
        match self.lookup_stage(parsed, deadline).await {
            Ok(documents) if !documents.is_empty() => {
                return SearchOutcome {
                    total_found: documents.len(),
                    documents,
                    errors,
                }
            }
            Ok(_) => debug!("Citation-lookup stage produced no results"),
            Err(e) => {
                warn!(error = %e, "Citation-lookup stage abandoned");
                errors.push(format!("Citation lookup failed: {}", e));
            }
        }

        // 3. Legacy structured-field queries
        match self.legacy_stage(parsed, deadline).await {
            Ok(documents) if !documents.is_empty() => {
                return SearchOutcome {
                    total_found: documents.len(),
                    documents,
                    errors,
                }
            }
            Ok(_) => debug!("Legacy stage produced no results"),
            Err(e) => {
                warn!(error = %e, "Legacy stage abandoned");
                errors.push(format!("Structured search failed: {}", e));
            }
        }

        // 4. Broadened fallback on the first word of the case name
        if let Some(first_word) = first_word(&parsed.case_name) {
            match self.broadened_stage(&first_word, deadline).await {
                Ok(documents) if !documents.is_empty() => {
                    errors.push(format!(
                        "Exact matches for \"{}\" were unavailable; showing broader results for \"{}\".",
                        parsed.full_citation, first_word
                    ));
                    return SearchOutcome {
                        total_found: documents.len(),
                        documents,
                        errors,
                    };
                }
                Ok(_) => debug!("Broadened stage produced no results"),
                Err(e) => {
                    warn!(error = %e, "Broadened stage abandoned");
                    errors.push(format!("Broadened search failed: {}", e));
                }
            }
        }

        // 5. Terminal: nothing found anywhere
        errors.push(format!(
            "No results found for \"{}\". Try a broader search mode or check the citation format.",
            parsed.full_citation
        ));
        SearchOutcome {
            documents: Vec::new(),
            total_found: 0,
            errors,
        }
    }

    /// Ordered full-text query variants for the requested mode
    fn fulltext_variants(&self, parsed: &ParsedCitation, mode: SearchMode) -> Vec<String> {
        let mut variants = Vec::new();

        variants.push(format!("\"{}\"", parsed.full_citation));
        if parsed.is_valid {
            variants.push(format!(
                "\"{} {} {}\"",
                parsed.volume, parsed.reporter, parsed.page
            ));
        }
        if !parsed.case_name.is_empty() {
            variants.push(format!("\"{}\"", parsed.case_name));
        }

        if mode != SearchMode::Exact {
            for party in parsed.case_name.split(" v. ") {
                let party = party.trim();
                if !party.is_empty() && party != parsed.case_name {
                    variants.push(format!("\"{}\"", party));
                }
            }
            if let Some(court) = &parsed.court {
                variants.push(format!("\"{}\" {}", parsed.case_name, court));
            }
        }

        if mode == SearchMode::Comprehensive {
            variants.push(parsed.full_citation.clone());
            if !parsed.case_name.is_empty() {
                variants.push(parsed.case_name.clone());
            }
        }

        let mut seen = HashSet::new();
        variants.retain(|v| seen.insert(v.clone()));
        variants
    }

    /// Stage 1: try each full-text variant until one yields hits
    async fn fulltext_stage(
        &self,
        parsed: &ParsedCitation,
        mode: SearchMode,
        deadline: &Deadline,
    ) -> Result<Option<(Vec<CaseDocument>, usize)>> {
        for variant in self.fulltext_variants(parsed, mode) {
            let response = self.client.search_v4(&variant, deadline).await?;
            if !response.results.is_empty() {
                debug!(
                    variant = variant.as_str(),
                    count = response.count,
                    "Full-text variant matched"
                );
                let documents = response.results.iter().map(normalize_v4_hit).collect();
                return Ok(Some((documents, response.count as usize)));
            }
        }
        Ok(None)
    }

    /// Stage 2: the dedicated citation-lookup endpoint on the raw citation
    async fn lookup_stage(
        &self,
        parsed: &ParsedCitation,
        deadline: &Deadline,
    ) -> Result<Vec<CaseDocument>> {
        let matches = self
            .client
            .citation_lookup(&parsed.full_citation, deadline)
            .await?;
        Ok(matches
            .iter()
            .filter(|m| m.status.map_or(true, |status| status == 200))
            .flat_map(normalize_lookup_match)
            .collect())
    }

    /// Stage 3: the ordered structured-field queries against the clusters
    /// endpoint, fetching cluster detail on demand for incomplete records
    async fn legacy_stage(
        &self,
        parsed: &ParsedCitation,
        deadline: &Deadline,
    ) -> Result<Vec<CaseDocument>> {
        for query in generate_queries(parsed) {
            let page = self.client.query_clusters(&query, deadline).await?;
            if page.results.is_empty() {
                continue;
            }

            let mut documents = Vec::new();
            for cluster in &page.results {
                let mut fetched = None;
                if cluster.sub_opinions.is_empty() && cluster.opinions.is_empty() {
                    if let Some(id) = cluster.id {
                        match self.client.fetch_cluster(id, deadline).await {
                            Ok(full) => fetched = Some(full),
                            Err(e) => {
                                debug!(cluster = id, error = %e, "Cluster detail fetch failed")
                            }
                        }
                    }
                }
                documents.extend(normalize_cluster(fetched.as_ref().unwrap_or(cluster)));
            }

            if !documents.is_empty() {
                self.hydrate_opinion_text(&mut documents, deadline).await;
                return Ok(documents);
            }
        }
        Ok(Vec::new())
    }

    /// Stage 4: first word of the case name through the legacy path
    async fn broadened_stage(
        &self,
        first_word: &str,
        deadline: &Deadline,
    ) -> Result<Vec<CaseDocument>> {
        let query = CitationSearchQuery {
            case_name: Some(first_word.to_string()),
            ..Default::default()
        };
        let page = self.client.query_clusters(&query, deadline).await?;
        Ok(page.results.iter().flat_map(normalize_cluster).collect())
    }

    /// Populate opinion text for the first few text-less legacy documents.
    /// Bounded by config to respect the upstream rate limit; failures leave
    /// the document as-is.
    async fn hydrate_opinion_text(&self, documents: &mut [CaseDocument], deadline: &Deadline) {
        let mut fetches = 0usize;
        for doc in documents.iter_mut() {
            if fetches >= self.config.search.max_opinion_fetches || deadline.is_expired() {
                break;
            }
            if doc.plain_text.is_some() {
                continue;
            }

            // Opinion ids live in the third segment of `cl-{cluster}-{opinion}`
            let parts: Vec<&str> = doc.id.split('-').collect();
            let opinion_id = match parts.as_slice() {
                ["cl", cluster, opinion] if *cluster != "v4" => {
                    match opinion.parse::<u64>() {
                        Ok(id) => id,
                        Err(_) => continue,
                    }
                }
                _ => continue,
            };

            fetches += 1;
            match self.client.fetch_opinion(opinion_id, deadline).await {
                Ok(opinion) => {
                    if let Some(text) = opinion.plain_text.filter(|t| !t.trim().is_empty()) {
                        doc.plain_text = Some(text);
                    }
                    if doc.download_url.is_none() {
                        doc.download_url = opinion.download_url;
                    }
                    if doc.page_count == 0 {
                        doc.page_count = opinion.page_count.unwrap_or(0);
                    }
                    if doc.doc_type == DocumentClass::BestGuess(DocumentType::Decision) {
                        let classified = classify_opinion_type(opinion.opinion_type.as_deref());
                        if matches!(classified, DocumentClass::Known(_)) {
                            doc.doc_type = classified;
                        }
                    }
                }
                Err(e) => debug!(opinion = opinion_id, error = %e, "Opinion text fetch failed"),
            }
        }
    }
}

/// First word of a case name, stripped of trailing punctuation
fn first_word(case_name: &str) -> Option<String> {
    case_name
        .split_whitespace()
        .next()
        .map(|w| w.trim_end_matches([',', '.']).to_string())
        .filter(|w| !w.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_engine(base_url: &str) -> CitationSearchEngine {
        let mut config = Config::default();
        config.courtlistener.api_url = base_url.to_string();
        config.courtlistener.min_request_interval_ms = 5;
        config.courtlistener.retry_attempts = 0;
        let config = Arc::new(config);
        let client = Arc::new(CourtListenerClient::new(&config.courtlistener).unwrap());
        CitationSearchEngine::new(config, client).unwrap()
    }

    fn empty_page() -> serde_json::Value {
        json!({ "count": 0, "results": [] })
    }

    async fn mount_empty_search(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
            .mount(server)
            .await;
    }

    async fn mount_empty_lookup(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(server)
            .await;
    }

    async fn mount_empty_clusters(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/clusters/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fulltext_results_short_circuit_the_cascade() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "results": [{
                    "cluster_id": 1,
                    "caseName": "Miller v. McDonald",
                    "court": "Ninth Circuit",
                    "docketNumber": "18-35441",
                    "dateFiled": "2019-12-10",
                    "snippet": "…remanded for further proceedings…",
                    "absolute_url": "/opinion/1/miller-v-mcdonald/"
                }]
            })))
            .mount(&server)
            .await;

        // The later stages must never be reached
        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/clusters/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
            .expect(0)
            .mount(&server)
            .await;

        let engine = test_engine(&server.uri());
        let outcome = engine
            .search("Miller v. McDonald, 944 F.3d 1050", SearchMode::Exact)
            .await;

        assert_eq!(outcome.total_found, 1);
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].id, "cl-v4-1");
        assert_eq!(
            outcome.documents[0].doc_type,
            DocumentClass::BestGuess(DocumentType::Decision)
        );
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn all_stages_empty_yields_not_found_message() {
        let server = MockServer::start().await;
        mount_empty_search(&server).await;
        mount_empty_lookup(&server).await;
        mount_empty_clusters(&server).await;

        let engine = test_engine(&server.uri());
        let outcome = engine.search("asdf", SearchMode::Exact).await;

        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.total_found, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("No results found for \"asdf\""));
    }

    #[tokio::test]
    async fn lookup_stage_is_used_when_fulltext_is_empty() {
        let server = MockServer::start().await;
        mount_empty_search(&server).await;

        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "citation": "944 F.3d 1050",
                "status": 200,
                "clusters": [{
                    "id": 9,
                    "case_name": "Miller v. McDonald",
                    "date_filed": "2019-12-10",
                    "sub_opinions": [
                        "https://www.courtlistener.com/api/rest/v4/opinions/101/"
                    ],
                    "citations": [{ "volume": 944, "reporter": "F.3d", "page": "1050" }]
                }]
            }])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/clusters/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
            .expect(0)
            .mount(&server)
            .await;

        let engine = test_engine(&server.uri());
        let outcome = engine
            .search("Miller v. McDonald, 944 F.3d 1050", SearchMode::Exact)
            .await;

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].id, "cl-9-101");
        assert_eq!(outcome.documents[0].court, "U.S. Court of Appeals");
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn legacy_stage_fetches_detail_and_hydrates_opinion_text() {
        let server = MockServer::start().await;
        mount_empty_search(&server).await;
        mount_empty_lookup(&server).await;

        // Listing entry with no nested opinion data
        Mock::given(method("GET"))
            .and(path("/clusters/"))
            .and(query_param("case_name", "Miller v. McDonald"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "results": [{
                    "id": 12,
                    "case_name": "Miller v. McDonald",
                    "date_filed": "2019-12-10",
                    "citations": [{ "volume": 944, "reporter": "F.3d", "page": "1050" }]
                }]
            })))
            .mount(&server)
            .await;

        // Full cluster record carries the sub-opinion reference
        Mock::given(method("GET"))
            .and(path("/clusters/12/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 12,
                "case_name": "Miller v. McDonald",
                "date_filed": "2019-12-10",
                "sub_opinions": ["https://www.courtlistener.com/api/rest/v4/opinions/77/"],
                "citations": [{ "volume": 944, "reporter": "F.3d", "page": "1050" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/opinions/77/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 77,
                "type": "020lead",
                "plain_text": "Recovered opinion text",
                "page_count": 9
            })))
            .mount(&server)
            .await;

        let engine = test_engine(&server.uri());
        let outcome = engine
            .search("Miller v. McDonald, 944 F.3d 1050", SearchMode::Exact)
            .await;

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].id, "cl-12-77");
        assert_eq!(
            outcome.documents[0].plain_text.as_deref(),
            Some("Recovered opinion text")
        );
        assert_eq!(outcome.documents[0].page_count, 9);
        assert_eq!(
            outcome.documents[0].doc_type,
            DocumentClass::Known(DocumentType::Decision)
        );
    }

    #[tokio::test]
    async fn broadened_fallback_annotates_results_with_caveat() {
        let server = MockServer::start().await;
        mount_empty_search(&server).await;
        mount_empty_lookup(&server).await;

        // Broadened first-word query finds what the exact queries could not
        Mock::given(method("GET"))
            .and(path("/clusters/"))
            .and(query_param("case_name", "Miller"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "results": [{
                    "id": 31,
                    "case_name": "Miller v. Alabama",
                    "date_filed": "2012-06-25",
                    "sub_opinions": ["https://www.courtlistener.com/api/rest/v4/opinions/42/"],
                    "citations": [{ "volume": 567, "reporter": "U.S.", "page": "460" }]
                }]
            })))
            .mount(&server)
            .await;
        mount_empty_clusters(&server).await;

        let engine = test_engine(&server.uri());
        let outcome = engine
            .search("Miller v. McDonald, 944 F.3d 1050", SearchMode::Exact)
            .await;

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].id, "cl-31-42");
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("broader results for \"Miller\""));
    }

    #[tokio::test]
    async fn stage_failures_are_recorded_and_cascade_continues() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream broken"))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/citation-lookup/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "citation": "410 U.S. 113",
                "status": 200,
                "clusters": [{
                    "id": 5,
                    "case_name": "Roe v. Wade",
                    "sub_opinions": ["https://www.courtlistener.com/api/rest/v4/opinions/3/"],
                    "citations": [{ "volume": 410, "reporter": "U.S.", "page": "113" }]
                }]
            }])))
            .mount(&server)
            .await;

        let engine = test_engine(&server.uri());
        let outcome = engine.search("Roe v. Wade, 410 U.S. 113", SearchMode::Exact).await;

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].id, "cl-5-3");
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("Full-text search failed"));
    }

    #[tokio::test]
    async fn related_mode_adds_party_variants() {
        let server = MockServer::start().await;
        let engine = test_engine(&server.uri());

        let parsed = engine.parse("Miller v. McDonald, 944 F.3d 1050");
        let exact = engine.fulltext_variants(&parsed, SearchMode::Exact);
        let related = engine.fulltext_variants(&parsed, SearchMode::Related);

        assert_eq!(
            exact,
            vec![
                "\"Miller v. McDonald, 944 F.3d 1050\"".to_string(),
                "\"944 F.3d 1050\"".to_string(),
                "\"Miller v. McDonald\"".to_string(),
            ]
        );
        assert!(related.contains(&"\"Miller\"".to_string()));
        assert!(related.contains(&"\"McDonald\"".to_string()));
        assert!(related.len() > exact.len());
    }

    #[tokio::test]
    async fn comprehensive_mode_unions_all_variant_families() {
        let server = MockServer::start().await;
        let engine = test_engine(&server.uri());

        let parsed = engine.parse("Miller v. McDonald, 944 F.3d 1050");
        let related = engine.fulltext_variants(&parsed, SearchMode::Related);
        let comprehensive = engine.fulltext_variants(&parsed, SearchMode::Comprehensive);

        for variant in &related {
            assert!(comprehensive.contains(variant));
        }
        assert!(comprehensive.contains(&"Miller v. McDonald, 944 F.3d 1050".to_string()));
        assert!(comprehensive.contains(&"Miller v. McDonald".to_string()));
    }

    #[test]
    fn validation_rejects_out_of_bounds_input() {
        let mut config = Config::default();
        config.courtlistener.api_url = "http://localhost:1".to_string();
        let config = Arc::new(config);
        let client = Arc::new(CourtListenerClient::new(&config.courtlistener).unwrap());
        let engine = CitationSearchEngine::new(config, client).unwrap();

        assert!(engine.validate("a").is_err());
        assert!(engine.validate(&"x".repeat(1000)).is_err());
        assert!(engine.validate("Miller v. McDonald").is_ok());
    }
}
