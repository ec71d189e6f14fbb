//! # Rate-Limited CourtListener Client
//!
//! ## Purpose
//! Wraps every outbound call to the CourtListener API behind one shared
//! throttle and a bounded retry policy, so the service stays inside the
//! upstream rate limits regardless of how many searches run concurrently.
//!
//! ## Input/Output Specification
//! - **Input**: Query strings, structured filters, cluster/opinion ids, a deadline
//! - **Output**: Typed deserialized responses, or a `SearchError` after the
//!   retry policy is exhausted
//! - **Rate Limits**: Minimum inter-request interval enforced process-wide;
//!   exponential backoff on throttled responses
//!
//! ## Key Features
//! - Process-wide throttle state, created once and shared by reference
//! - Exponential backoff (`2^attempt` seconds) on HTTP 429/403, bounded retries
//! - Immediate failure on any other non-2xx status
//! - Deadline propagation through every request
//! - Token authentication and descriptive User-Agent
//! - Request statistics for the stats/health endpoints

use crate::config::CourtListenerConfig;
use crate::errors::{Result, SearchError};
use crate::queries::CitationSearchQuery;
use crate::utils::TextUtils;
use crate::Deadline;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use super::{CitationLookupMatch, ClustersPage, OpinionCluster, OpinionRecord, V4SearchResponse};

/// Simple inter-request throttle. The interval is measured from the end of
/// the previous request to the start of the next one.
struct Throttle {
    min_interval: Duration,
    last_finished: Option<Instant>,
}

impl Throttle {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_finished: None,
        }
    }

    async fn pace(&self) {
        if let Some(last) = self.last_finished {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
    }

    fn mark_finished(&mut self) {
        self.last_finished = Some(Instant::now());
    }
}

/// Health status of the upstream API
#[derive(Debug, Clone, Serialize)]
pub struct SourceHealth {
    pub is_healthy: bool,
    pub last_check: DateTime<Utc>,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
}

/// Process-wide request statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientStats {
    pub requests_made: u64,
    pub rate_limit_hits: u64,
    pub retries_performed: u64,
    pub last_request_at: Option<DateTime<Utc>>,
}

/// Rate-limited CourtListener API client
pub struct CourtListenerClient {
    http: Client,
    base_url: String,
    throttle: Arc<Mutex<Throttle>>,
    stats: Arc<RwLock<ClientStats>>,
    retry_attempts: u32,
    page_size: usize,
}

impl CourtListenerClient {
    /// Create a new client. Throttle and statistics state live behind `Arc`
    /// so clones of the client (and every caller holding one) share them.
    pub fn new(config: &CourtListenerConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", token)
                    .parse()
                    .map_err(|e| SearchError::Config {
                        message: format!("Invalid API token format: {}", e),
                    })?,
            );
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SearchError::Network {
                operation: "client construction".to_string(),
                details: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            throttle: Arc::new(Mutex::new(Throttle::new(Duration::from_millis(
                config.min_request_interval_ms,
            )))),
            stats: Arc::new(RwLock::new(ClientStats::default())),
            retry_attempts: config.retry_attempts,
            page_size: config.page_size,
        })
    }

    /// v4 full-text search
    pub async fn search_v4(&self, query: &str, deadline: &Deadline) -> Result<V4SearchResponse> {
        let page_size = self.page_size.to_string();
        let request = self.http.get(format!("{}/search/", self.base_url)).query(&[
            ("q", query),
            ("type", "o"),
            ("order_by", "score desc"),
            ("stat_Precedential", "on"),
            ("page_size", page_size.as_str()),
        ]);
        debug!(query = query, "CourtListener: full-text search");
        self.execute_json(request, "full-text search", deadline)
            .await
    }

    /// Dedicated citation-lookup endpoint
    pub async fn citation_lookup(
        &self,
        text: &str,
        deadline: &Deadline,
    ) -> Result<Vec<CitationLookupMatch>> {
        let request = self
            .http
            .post(format!("{}/citation-lookup/", self.base_url))
            .form(&[("text", text)]);
        debug!(text = text, "CourtListener: citation lookup");
        self.execute_json(request, "citation lookup", deadline)
            .await
    }

    /// Legacy structured-field query against the clusters endpoint
    pub async fn query_clusters(
        &self,
        query: &CitationSearchQuery,
        deadline: &Deadline,
    ) -> Result<ClustersPage> {
        let mut params: Vec<(&str, String)> = vec![
            ("page_size", self.page_size.to_string()),
            ("precedential_status", "Published".to_string()),
        ];
        if let Some(name) = &query.case_name {
            params.push(("case_name", name.clone()));
        }
        if let Some(cite) = &query.citation {
            // Federal reporters filter best through the dedicated field
            if is_federal_citation(cite) {
                params.push(("federal_cite_one", cite.clone()));
            } else {
                params.push(("citation", cite.clone()));
            }
        }
        if let Some(court) = &query.court {
            params.push(("court", court.clone()));
        }
        if let Some(min) = query.year_min {
            params.push(("date_filed__gte", format!("{}-01-01", min)));
        }
        if let Some(max) = query.year_max {
            params.push(("date_filed__lte", format!("{}-12-31", max)));
        }
        let request = self
            .http
            .get(format!("{}/clusters/", self.base_url))
            .query(&params);
        debug!(?query, "CourtListener: clusters query");
        self.execute_json(request, "clusters query", deadline).await
    }

    /// Fetch a full cluster record by id
    pub async fn fetch_cluster(&self, id: u64, deadline: &Deadline) -> Result<OpinionCluster> {
        let request = self
            .http
            .get(format!("{}/clusters/{}/", self.base_url, id));
        self.execute_json(request, "cluster detail", deadline).await
    }

    /// Fetch a full opinion record by id
    pub async fn fetch_opinion(&self, id: u64, deadline: &Deadline) -> Result<OpinionRecord> {
        let request = self
            .http
            .get(format!("{}/opinions/{}/", self.base_url, id));
        self.execute_json(request, "opinion detail", deadline).await
    }

    /// Probe upstream reachability with one throttled, minimal request.
    /// Never fails; failures are reported inside the returned health record.
    pub async fn health_check(&self, deadline: &Deadline) -> SourceHealth {
        let started = std::time::Instant::now();
        let request = self.http.get(format!("{}/search/", self.base_url)).query(&[
            ("q", "citation"),
            ("type", "o"),
            ("page_size", "1"),
        ]);
        let result: Result<serde_json::Value> =
            self.execute_json(request, "health check", deadline).await;
        let response_time_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(_) => SourceHealth {
                is_healthy: true,
                last_check: Utc::now(),
                response_time_ms,
                error_message: None,
            },
            Err(e) => SourceHealth {
                is_healthy: false,
                last_check: Utc::now(),
                response_time_ms,
                error_message: Some(e.to_string()),
            },
        }
    }

    /// Snapshot of the process-wide request statistics
    pub async fn stats(&self) -> ClientStats {
        self.stats.read().await.clone()
    }

    /// Issue one request with pacing, retry and deadline enforcement, then
    /// deserialize the JSON body.
    ///
    /// The throttle is held across the whole attempt sequence: concurrent
    /// searches serialize their outbound calls, keeping the inter-request
    /// interval a process-wide guarantee rather than a per-search one.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
        deadline: &Deadline,
    ) -> Result<T> {
        let mut throttle = self.throttle.lock().await;
        let mut attempt: u32 = 0;

        loop {
            if deadline.is_expired() {
                return Err(SearchError::DeadlineExceeded {
                    operation: operation.to_string(),
                    elapsed_ms: deadline.elapsed_ms(),
                });
            }

            throttle.pace().await;

            let remaining = deadline.remaining();
            if remaining.is_zero() {
                return Err(SearchError::DeadlineExceeded {
                    operation: operation.to_string(),
                    elapsed_ms: deadline.elapsed_ms(),
                });
            }

            let builder = request.try_clone().ok_or_else(|| SearchError::Internal {
                message: "Request body is not cloneable for retry".to_string(),
            })?;

            let response = match timeout(remaining, builder.send()).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    throttle.mark_finished();
                    self.record_request().await;
                    return Err(SearchError::Network {
                        operation: operation.to_string(),
                        details: e.to_string(),
                    });
                }
                Err(_) => {
                    throttle.mark_finished();
                    self.record_request().await;
                    return Err(SearchError::DeadlineExceeded {
                        operation: operation.to_string(),
                        elapsed_ms: deadline.elapsed_ms(),
                    });
                }
            };

            throttle.mark_finished();
            self.record_request().await;

            let status = response.status();
            if status.is_success() {
                let body = response.text().await.map_err(|e| SearchError::Network {
                    operation: operation.to_string(),
                    details: e.to_string(),
                })?;
                return serde_json::from_str(&body).map_err(|e| SearchError::DataParsing {
                    upstream: format!("CourtListener {}", operation),
                    details: format!("{} (body: {})", e, TextUtils::truncate(&body, 200)),
                });
            }

            let code = status.as_u16();
            if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
                self.record_rate_limit().await;

                if attempt >= self.retry_attempts {
                    warn!(
                        status = code,
                        attempts = attempt + 1,
                        "CourtListener: retries exhausted"
                    );
                    return Err(SearchError::RateLimitExceeded {
                        upstream: "CourtListener".to_string(),
                        status: code,
                        attempts: attempt + 1,
                    });
                }

                let backoff = Duration::from_secs(1u64 << attempt);
                warn!(
                    status = code,
                    attempt = attempt,
                    backoff_secs = backoff.as_secs(),
                    "CourtListener: throttled, backing off"
                );
                self.record_retry().await;
                sleep(backoff.min(deadline.remaining())).await;
                attempt += 1;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::UpstreamStatus {
                status: code,
                details: TextUtils::truncate(&body, 200),
            });
        }
    }

    async fn record_request(&self) {
        let mut stats = self.stats.write().await;
        stats.requests_made += 1;
        stats.last_request_at = Some(Utc::now());
    }

    async fn record_rate_limit(&self) {
        self.stats.write().await.rate_limit_hits += 1;
    }

    async fn record_retry(&self) {
        self.stats.write().await.retries_performed += 1;
    }
}

/// Whether a `Volume Reporter Page` string refers to a federal reporter
fn is_federal_citation(citation: &str) -> bool {
    citation.contains("U.S.") || citation.contains("S. Ct.") || citation.contains("F.")
}
