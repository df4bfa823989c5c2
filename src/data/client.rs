//! CKAN `datastore_search` client for the REM 20 resource.
//!
//! Fetching is done one year at a time. Each year is paged with `limit`/`offset`
//! until the server runs out of records. A transport failure ends that year
//! only; the remaining years are still fetched.

use std::collections::HashSet;

use log::{debug, error, info};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::domain::{RawRecord, columns};
use crate::error::{AppError, TransportError};

/// One page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// Exact-match filter on `PERIODO`; `None` means unfiltered.
    pub year: Option<i32>,
    pub limit: usize,
    pub offset: usize,
}

impl PageQuery {
    /// Query-string parameters for this page.
    pub fn params(&self, resource_id: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("resource_id", resource_id.to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(year) = self.year {
            params.push(("filters", year_filter(year)));
        }
        params
    }
}

/// JSON exact-match filter for one year, e.g. `{"PERIODO":"2025"}`.
pub fn year_filter(year: i32) -> String {
    let mut filter = serde_json::Map::new();
    filter.insert(columns::PERIOD.to_string(), year.to_string().into());
    serde_json::Value::Object(filter).to_string()
}

/// Body of a `datastore_search` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatastoreResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<DatastoreResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatastoreResult {
    #[serde(default)]
    pub records: Vec<RawRecord>,
    /// Total matching records as reported by the server.
    #[serde(default)]
    pub total: Option<u64>,
}

/// Anything that can answer a page request.
pub trait PageSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<DatastoreResponse, TransportError>;
}

/// Blocking HTTP transport against a CKAN instance.
pub struct HttpPageSource {
    client: Client,
    api_url: String,
    resource_id: String,
}

impl HttpPageSource {
    pub fn new(config: &ClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::usage(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            resource_id: config.resource_id.clone(),
        })
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<DatastoreResponse, TransportError> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(&query.params(&self.resource_id))
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        resp.json::<DatastoreResponse>()
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// A year whose pagination was cut short by a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearError {
    /// `None` for the unfiltered pass.
    pub year: Option<i32>,
    pub error: TransportError,
}

impl std::fmt::Display for YearError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "period {year}: {}", self.error),
            None => write!(f, "unfiltered fetch: {}", self.error),
        }
    }
}

/// Everything one `fetch` call produced.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// All retrieved records, in arrival order.
    pub records: Vec<RawRecord>,
    pub errors: Vec<YearError>,
    /// HTTP requests issued (including failed ones).
    pub requests: usize,
    /// Number of year passes attempted.
    pub passes: usize,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when every pass failed at the transport level and nothing was retrieved.
    ///
    /// A pass that failed after some pages succeeded still contributes records.
    pub fn all_failed(&self) -> bool {
        self.passes > 0 && self.errors.len() == self.passes && self.records.is_empty()
    }
}

pub struct Rem20Client<S = HttpPageSource> {
    source: S,
    page_size: usize,
}

impl Rem20Client<HttpPageSource> {
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        Ok(Self::new(HttpPageSource::new(config)?, config.page_size))
    }
}

impl<S: PageSource> Rem20Client<S> {
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch all records for `years` (deduplicated, first-seen order kept).
    ///
    /// An empty `years` slice means a single unfiltered pass.
    pub fn fetch(&self, years: &[i32]) -> FetchOutcome {
        let passes: Vec<Option<i32>> = if years.is_empty() {
            vec![None]
        } else {
            let mut seen = HashSet::new();
            years.iter().copied().filter(|y| seen.insert(*y)).map(Some).collect()
        };

        let mut outcome = FetchOutcome::default();
        for year in passes {
            outcome.passes += 1;
            let before = outcome.records.len();
            self.fetch_year(year, &mut outcome);
            info!(
                "Fetched {} record(s) for {}",
                outcome.records.len() - before,
                describe_pass(year)
            );
        }
        outcome
    }

    fn fetch_year(&self, year: Option<i32>, outcome: &mut FetchOutcome) {
        let mut offset = 0usize;
        let mut total: Option<u64> = None;

        loop {
            let query = PageQuery {
                year,
                limit: self.page_size,
                offset,
            };
            outcome.requests += 1;

            let page = match self.source.fetch_page(&query) {
                Ok(page) => page,
                Err(err) => {
                    error!("Datastore request failed for {}: {err}", describe_pass(year));
                    outcome.errors.push(YearError { year, error: err });
                    return;
                }
            };

            if !page.success {
                debug!("Datastore reported success=false for {}; stopping", describe_pass(year));
                return;
            }

            let result = page.result.unwrap_or_default();
            if result.total.is_some() {
                total = result.total;
            }
            if result.records.is_empty() {
                return;
            }

            offset += result.records.len();
            debug!(
                "{}: page at offset {} returned {} record(s), total={:?}",
                describe_pass(year),
                query.offset,
                result.records.len(),
                total
            );
            outcome.records.extend(result.records);

            if let Some(total) = total {
                if offset as u64 >= total {
                    return;
                }
            }
        }
    }
}

fn describe_pass(year: Option<i32>) -> String {
    match year {
        Some(year) => format!("period {year}"),
        None => "all periods".to_string(),
    }
}
