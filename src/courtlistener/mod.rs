//! # CourtListener Integration Module
//!
//! ## Purpose
//! Everything that touches the CourtListener REST API: typed response
//! shapes, the rate-limited HTTP client, and the normalizer that maps
//! heterogeneous upstream records into uniform `CaseDocument`s.
//!
//! ## Input/Output Specification
//! - **Input**: Search strings, structured query filters, cluster/opinion ids
//! - **Output**: Typed deserialized responses and normalized documents
//! - **Upstream**: v4 full-text search, citation lookup, legacy clusters,
//!   cluster detail, opinion detail
//!
//! ## Key Features
//! - One discriminated struct per upstream response shape; each shape is
//!   explicitly mapped to the internal record rather than duck-typed
//! - Tolerance for missing/partial fields everywhere (`serde(default)`)
//! - Sub-opinion references arrive either as URL strings or embedded
//!   objects; both are modeled
//!
//! ## Architecture
//! - `client.rs`: rate-limited, retrying HTTP client with shared throttle
//! - `normalize.rs`: pure upstream-shape → `CaseDocument` conversions

pub mod client;
pub mod normalize;

pub use client::{ClientStats, CourtListenerClient, SourceHealth};

use serde::Deserialize;

/// Response page of the v4 full-text search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct V4SearchResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<V4SearchHit>,
}

/// One hit of the v4 full-text search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct V4SearchHit {
    pub cluster_id: Option<u64>,
    #[serde(rename = "caseName", default)]
    pub case_name: String,
    #[serde(default)]
    pub court: String,
    #[serde(rename = "docketNumber")]
    pub docket_number: Option<String>,
    #[serde(rename = "dateFiled")]
    pub date_filed: Option<String>,
    #[serde(default)]
    pub snippet: String,
    pub absolute_url: Option<String>,
    #[serde(default)]
    pub opinions: Vec<V4HitOpinion>,
}

/// Nested opinion entry of a v4 search hit
#[derive(Debug, Clone, Deserialize)]
pub struct V4HitOpinion {
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub opinion_type: Option<String>,
    pub download_url: Option<String>,
}

/// One entry of the citation-lookup endpoint's response array
#[derive(Debug, Clone, Deserialize)]
pub struct CitationLookupMatch {
    #[serde(default)]
    pub citation: String,
    pub status: Option<u16>,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub clusters: Vec<OpinionCluster>,
}

/// Paginated response of the legacy clusters endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ClustersPage {
    #[serde(default)]
    pub count: u64,
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<OpinionCluster>,
}

/// An opinion cluster: the upstream grouping of all opinions (majority,
/// dissent, concurrence) belonging to one case decision
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpinionCluster {
    pub id: Option<u64>,
    #[serde(default)]
    pub case_name: String,
    #[serde(default)]
    pub case_name_full: String,
    pub absolute_url: Option<String>,
    pub docket: Option<String>,
    pub date_filed: Option<String>,
    #[serde(default)]
    pub citations: Vec<ClusterCitation>,
    #[serde(default)]
    pub sub_opinions: Vec<SubOpinionRef>,
    /// Legacy embedded opinions array, populated by older API revisions
    #[serde(default)]
    pub opinions: Vec<OpinionRecord>,
    #[serde(default)]
    pub syllabus: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub judges: String,
    pub precedential_status: Option<String>,
}

/// One citation attached to a cluster
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterCitation {
    pub volume: Option<i64>,
    #[serde(default)]
    pub reporter: String,
    pub page: Option<String>,
}

impl ClusterCitation {
    /// Render back to `Volume Reporter Page` form
    pub fn display(&self) -> String {
        format!(
            "{} {} {}",
            self.volume.map(|v| v.to_string()).unwrap_or_default(),
            self.reporter,
            self.page.clone().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

/// A cluster's sub-opinion reference: either a bare API URL or an embedded
/// opinion object, depending on the endpoint and API revision
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubOpinionRef {
    Embedded(OpinionRecord),
    Url(String),
}

/// One opinion record (embedded in a cluster or fetched by id)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpinionRecord {
    pub id: Option<u64>,
    pub resource_uri: Option<String>,
    #[serde(rename = "type")]
    pub opinion_type: Option<String>,
    pub author_str: Option<String>,
    pub download_url: Option<String>,
    pub plain_text: Option<String>,
    pub page_count: Option<u32>,
}
