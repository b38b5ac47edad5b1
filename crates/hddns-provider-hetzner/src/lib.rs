// # Hetzner Cloud DNS Provider
//
// This crate provides the Hetzner Cloud DNS (RRSet API) provider for hddns.
//
// ## Behaviour
//
// - ✅ One HTTP request per trait call (plus extra pages when listing)
// - ✅ Full error propagation to the engine (the engine decides what to skip)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401, 403, 404, 409, 422, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ✅ Any record type the API accepts (A, AAAA, CNAME, TXT, MX, ...)
// - ❌ NO retry logic (failed records are picked up by the next cycle)
// - ❌ NO caching (record sets are fetched fresh every cycle)
// - ❌ NO background tasks
//
// ## Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTPS API calls to the Hetzner Cloud API only
// - ✅ Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic (owned by the poll loop)
// - ❌ Make scheduling decisions (owned by SyncEngine)
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Hetzner Cloud API v1: https://docs.hetzner.cloud/reference/cloud#dns
// - List RRSets: GET `/zones/:zone/rrsets?page=N&per_page=100`
// - Create RRSet: POST `/zones/:zone/rrsets`
// - Set Records: POST `/zones/:zone/rrsets/:name/:type/actions/set_records`

use async_trait::async_trait;
use hddns_core::traits::{RecordSet, RecordSetProvider, RecordValue};
use hddns_core::{Error, Result};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hetzner Cloud API base URL
pub const HETZNER_API_BASE: &str = "https://api.hetzner.cloud/v1";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size requested when listing record sets
const PAGE_SIZE: u32 = 100;

/// Hetzner Cloud DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is stateless and single-shot. Skipping and retrying
/// failed work is owned by `SyncEngine`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (record set listing)
/// - Log the intended POST payload
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct HetznerProvider {
    /// Hetzner Cloud API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL (overridable for tests)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for HetznerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HetznerProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl HetznerProvider {
    /// Create a new Hetzner provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Hetzner Cloud API token with read/write access to DNS
    /// - `dry_run`: If true, perform GET requests but skip mutations
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Hetzner API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if dry_run {
            tracing::warn!("Hetzner provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            api_token,
            base_url: HETZNER_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a new Hetzner provider (production/live mode)
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, false)
    }

    /// Create a new Hetzner provider (dry-run mode)
    pub fn new_dry_run(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, true)
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether mutations are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Build an endpoint URL, percent-encoding each path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("Invalid API base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("Invalid API base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch one page of record sets
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone/rrsets?page=1&per_page=100
    /// Authorization: Bearer <token>
    /// ```
    async fn list_page(&self, zone: &str, page: u32) -> Result<RrsetListResponse> {
        let url = self.endpoint(&["zones", zone, "rrsets"])?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .query(&[("page", page), ("per_page", PAGE_SIZE)])
            .send()
            .await
            .map_err(|e| Error::transient_provider("hetzner", format!("HTTP request failed: {}", e)))?;

        let response = check_status(response, &format!("zone {}", zone)).await?;

        response
            .json()
            .await
            .map_err(|e| Error::provider("hetzner", format!("Failed to parse response: {}", e)))
    }

    /// POST a JSON payload, or log it in dry-run mode
    async fn post<T: Serialize + ?Sized>(&self, url: Url, payload: &T, context: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(payload).unwrap_or_default()
            );
            return Ok(());
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::transient_provider("hetzner", format!("HTTP request failed: {}", e)))?;

        check_status(response, context).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordSetProvider for HetznerProvider {
    async fn list_record_sets(&self, zone: &str) -> Result<Vec<RecordSet>> {
        let mut record_sets = Vec::new();
        let mut page = 1;

        loop {
            let response = self.list_page(zone, page).await?;
            let next_page = response.next_page();
            record_sets.extend(response.rrsets);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        tracing::debug!("Fetched {} record set(s) for zone {}", record_sets.len(), zone);
        Ok(record_sets)
    }

    async fn create_record_set(
        &self,
        zone: &str,
        name: &str,
        record_type: &str,
        records: &[RecordValue],
        ttl: Option<u32>,
    ) -> Result<()> {
        let url = self.endpoint(&["zones", zone, "rrsets"])?;
        let payload = CreateRrsetRequest {
            name,
            record_type,
            records,
            ttl,
        };

        self.post(url, &payload, &format!("{} ({}) in zone {}", name, record_type, zone))
            .await
    }

    async fn set_record_values(
        &self,
        zone: &str,
        name: &str,
        record_type: &str,
        records: &[RecordValue],
        ttl: Option<u32>,
    ) -> Result<()> {
        let url = self.endpoint(&[
            "zones",
            zone,
            "rrsets",
            name,
            record_type,
            "actions",
            "set_records",
        ])?;
        let payload = SetRecordsRequest { records, ttl };

        self.post(url, &payload, &format!("{} ({}) in zone {}", name, record_type, zone))
            .await
    }

    fn provider_name(&self) -> &'static str {
        "hetzner"
    }
}

/// Map a non-success HTTP status to a specific error
async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(status_error(status, &error_text, context))
}

fn status_error(status: StatusCode, error_text: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", context, error_text)),
        409 => Error::provider(
            "hetzner",
            format!("Conflict: {} - {}", status, error_text),
        ),
        422 => Error::provider(
            "hetzner",
            format!("Validation failed for {}: {} - {}", context, status, error_text),
        ),
        429 => Error::rate_limited(format!(
            "Hetzner API rate limit exceeded. Status: {}",
            status
        )),
        500..=599 => Error::transient_provider(
            "hetzner",
            format!("Hetzner server error: {} - {}", status, error_text),
        ),
        _ => Error::provider(
            "hetzner",
            format!("Request for {} failed: {} - {}", context, status, error_text),
        ),
    }
}

/// `GET /zones/:zone/rrsets` response body
#[derive(Debug, Deserialize)]
struct RrsetListResponse {
    #[serde(default)]
    rrsets: Vec<RecordSet>,
    #[serde(default)]
    meta: Option<ResponseMeta>,
}

impl RrsetListResponse {
    fn next_page(&self) -> Option<u32> {
        self.meta.as_ref()?.pagination.as_ref()?.next_page
    }
}

#[derive(Debug, Deserialize)]
struct ResponseMeta {
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_page: Option<u32>,
}

/// `POST /zones/:zone/rrsets` request body
#[derive(Debug, Serialize)]
struct CreateRrsetRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    records: &'a [RecordValue],
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
}

/// `POST .../actions/set_records` request body
#[derive(Debug, Serialize)]
struct SetRecordsRequest<'a> {
    records: &'a [RecordValue],
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
}
