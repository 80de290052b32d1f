// # Cloudflare Record Store
//
// This crate provides a Cloudflare implementation of `RecordStore`.
//
// ## Behavior
//
// - `find_record` lists the zone's "A" records for the domain and insists
//   on exactly one match
// - `update_record` sends a single PATCH with the new content
// - No retries, no backoff, no record caching: the engine owns the cadence
// - Dry-run mode performs reads and logs the intended write instead
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::traits::{
    DnsRecord, RECORD_TYPE_A, RecordStore, RecordStoreFactory, select_single_record,
};
use ddns_core::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// TTL value Cloudflare interprets as "automatic"
const TTL_AUTOMATIC: u32 = 1;

/// Response envelope shared by every v4 endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiZone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
}

impl From<ApiRecord> for DnsRecord {
    fn from(record: ApiRecord) -> Self {
        DnsRecord::new(record.id, record.name, record.record_type, record.content)
    }
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Map an unsuccessful HTTP status to a provider error
fn status_error(status: reqwest::StatusCode, body: &str, what: &str) -> Error {
    // Prefer the API's own error list when the body carries one
    let detail = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .map(|r| describe_errors(&r.errors))
        .unwrap_or_else(|_| body.to_string());

    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: Invalid API token or insufficient permissions. Status: {} - {}",
            status, detail
        ),
        404 => format!("{} failed: resource not found. Status: {} - {}", what, status, detail),
        409 => format!(
            "Conflict: Record is being updated by another process. Status: {}",
            status
        ),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!(
            "Cloudflare server error (transient): {} - {}",
            status, detail
        ),
        _ => format!("{} failed: {} - {}", what, status, detail),
    };

    Error::provider("cloudflare", message)
}

/// Zone names that may hold a record, longest first
///
/// "home.example.co.uk" yields "home.example.co.uk", "example.co.uk" and
/// "co.uk". The bare TLD is never a candidate.
fn zone_candidates(domain: &str) -> Result<Vec<String>> {
    let parts: Vec<&str> = domain.trim_end_matches('.').split('.').collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::config(format!("Invalid domain name: {}", domain)));
    }

    Ok((0..parts.len() - 1).map(|i| parts[i..].join(".")).collect())
}

/// Cloudflare DNS record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended PATCH payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Configured zone ID
    zone_id: Option<String>,

    /// Zone name used for lookup when no zone ID is configured
    zone_name: Option<String>,

    /// Zone ID resolved by lookup; zones do not move, records are never cached
    resolved_zone_id: OnceLock<String>,

    /// TTL sent with every update (`None` = automatic)
    ttl: Option<u32>,

    /// Proxy flag sent with every update (`None` = leave unchanged)
    proxied: Option<bool>,

    /// API base URL (overridable for tests)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("zone_name", &self.zone_name)
            .field("ttl", &self.ttl)
            .field("proxied", &self.proxied)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare record store
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (looked up by name when absent)
    /// - `dry_run`: If true, perform GET requests but skip writes
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id: zone_id.filter(|z| !z.is_empty()),
            zone_name: None,
            resolved_zone_id: OnceLock::new(),
            ttl: None,
            proxied: None,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Zone name to look up when no zone ID is configured
    pub fn with_zone_name(mut self, zone_name: Option<String>) -> Self {
        self.zone_name = zone_name.filter(|z| !z.is_empty());
        self
    }

    /// TTL sent with updates (`None` = automatic)
    pub fn with_ttl(mut self, ttl: Option<u32>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Proxy flag sent with updates
    pub fn with_proxied(mut self, proxied: Option<bool>) -> Self {
        self.proxied = proxied;
        self
    }

    /// Point the store at another API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send a request and unwrap the v4 response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, what));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::provider("cloudflare", format!("Failed to parse response: {}", e))
        })?;

        if !envelope.success {
            return Err(Error::provider(
                "cloudflare",
                format!("API call returned error: {}", describe_errors(&envelope.errors)),
            ));
        }

        envelope.result.ok_or_else(|| {
            Error::provider("cloudflare", format!("{}: response has no result", what))
        })
    }

    /// Get the zone ID for a domain
    ///
    /// Order: configured zone ID, previously resolved zone ID, lookup by
    /// configured zone name, lookup of each suffix of `domain` (longest
    /// first) until one is a zone on the account.
    async fn zone_id_for(&self, domain: Option<&str>) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            return Ok(zone_id.clone());
        }
        if let Some(zone_id) = self.resolved_zone_id.get() {
            return Ok(zone_id.clone());
        }

        let candidates = match (&self.zone_name, domain) {
            (Some(name), _) => vec![name.clone()],
            (None, Some(domain)) => zone_candidates(domain)?,
            (None, None) => {
                return Err(Error::config(
                    "Cloudflare zone is unknown: configure zone_id or zone_name",
                ));
            }
        };

        let url = format!("{}/zones", self.base_url);
        for zone_name in &candidates {
            tracing::debug!("Looking up zone ID for zone: {}", zone_name);

            let zones: Vec<ApiZone> = self
                .send(
                    self.client.get(&url).query(&[("name", zone_name.as_str())]),
                    "Zone lookup",
                )
                .await?;

            if let Some(zone) = zones.into_iter().next() {
                tracing::debug!("Found zone ID: {}", zone.id);
                let _ = self.resolved_zone_id.set(zone.id.clone());
                return Ok(zone.id);
            }
        }

        Err(Error::provider(
            "cloudflare",
            format!("Zone not found: tried {}", candidates.join(", ")),
        ))
    }
}

#[async_trait]
impl RecordStore for CloudflareProvider {
    async fn find_record(&self, domain: &str) -> Result<DnsRecord> {
        let zone_id = self.zone_id_for(Some(domain)).await?;

        tracing::debug!(domain, "Looking up A record");

        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
        let records: Vec<ApiRecord> = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("type", RECORD_TYPE_A), ("name", domain)]),
                "Record lookup",
            )
            .await?;

        let record = select_single_record(records.into_iter().map(DnsRecord::from), domain)?;
        tracing::debug!(domain, record_id = %record.id, content = %record.content, "Found A record");
        Ok(record)
    }

    async fn update_record(&self, record_id: &str, content: &str) -> Result<()> {
        let zone_id = self.zone_id_for(None).await?;
        let url = format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record_id);

        let mut payload = serde_json::json!({
            "content": content,
            "ttl": self.ttl.unwrap_or(TTL_AUTOMATIC),
        });
        if let Some(proxied) = self.proxied {
            payload["proxied"] = serde_json::Value::Bool(proxied);
        }

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                payload
            );
            return Ok(());
        }

        let _: serde_json::Value = self
            .send(self.client.patch(&url).json(&payload), "Record update")
            .await?;

        tracing::info!(record_id, content, "DNS record updated");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare record stores
pub struct CloudflareFactory;

impl CloudflareFactory {
    /// Build the concrete store described by `config`
    pub fn build(&self, config: &ProviderConfig) -> Result<CloudflareProvider> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                zone_name,
                ttl,
                proxied,
                dry_run,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }

                if *dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(
                    CloudflareProvider::new(api_token.clone(), zone_id.clone(), *dry_run)?
                        .with_zone_name(zone_name.clone())
                        .with_ttl(*ttl)
                        .with_proxied(*proxied),
                )
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

impl RecordStoreFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
        Ok(Box::new(self.build(config)?))
    }
}

/// Register the Cloudflare record store with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddns_provider_cloudflare::register(&registry);
/// assert!(registry.has_record_store("cloudflare"));
/// ```
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_record_store("cloudflare", Box::new(CloudflareFactory));
}
