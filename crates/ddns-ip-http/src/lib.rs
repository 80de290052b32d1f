// # HTTP Address Providers
//
// This crate provides HTTP-based address providers for the DDNS system.
//
// ## Backends
//
// - **Gateway**: queries the LAN status endpoint of a home gateway and reads
//   the WAN section (`wan.online`, `wan.localIpAddress`). An offline WAN
//   link means the address is unknown.
// - **Echo**: queries a "what is my IP" service that answers with the
//   caller's address as plain text (e.g. api.ipify.org).
//
// Both perform one GET per discovery, no retries and no caching. Every
// failure is logged and reported as `Address::Unknown`.

use ddns_core::ProviderRegistry;
use ddns_core::config::AddressSourceConfig;
use ddns_core::traits::{Address, AddressProvider, AddressProviderFactory};
use ddns_core::{Error, Result};

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Default HTTP timeout for discovery requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// GET `url` and return the body of a successful response
async fn fetch_text(client: &reqwest::Client, source: &str, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::provider(source, format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::provider(
            source,
            format!("HTTP error: {}", response.status()),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| Error::provider(source, format!("Failed to read response: {}", e)))
}

fn parse_ipv4(source: &str, text: &str) -> Result<Ipv4Addr> {
    let text = text.trim();
    text.parse()
        .map_err(|_| Error::provider(source, format!("Invalid IPv4 address: {:?}", text)))
}

/// Gateway status document
///
/// Only the WAN section matters; software/system sections are ignored.
#[derive(Debug, Deserialize)]
struct GatewayStatus {
    wan: WanStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WanStatus {
    #[serde(default)]
    online: bool,
    #[serde(default)]
    local_ip_address: String,
}

/// Address provider backed by a gateway's JSON status endpoint
#[derive(Debug, Clone)]
pub struct GatewayAddressProvider {
    /// Status endpoint URL
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl GatewayAddressProvider {
    /// Create a new gateway address provider
    ///
    /// # Parameters
    ///
    /// - `url`: Status URL (e.g., "http://192.168.86.1/api/v1/status")
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: build_client(),
        }
    }

    /// Fetch and interpret the status document
    async fn fetch_ip(&self) -> Result<Ipv4Addr> {
        let body = fetch_text(&self.client, "gateway", &self.url).await?;

        let status: GatewayStatus = serde_json::from_str(&body)
            .map_err(|e| Error::provider("gateway", format!("Malformed status document: {}", e)))?;

        if !status.wan.online {
            return Err(Error::provider("gateway", "WAN link is not online"));
        }

        parse_ipv4("gateway", &status.wan.local_ip_address)
    }
}

#[async_trait::async_trait]
impl AddressProvider for GatewayAddressProvider {
    async fn discover(&self) -> Address {
        match self.fetch_ip().await {
            Ok(ip) => {
                tracing::debug!(url = %self.url, address = %ip, "Gateway reported WAN address");
                Address::Known(ip)
            }
            Err(e) => {
                tracing::warn!(url = %self.url, "Unable to determine IP address: {}", e);
                Address::Unknown
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "gateway"
    }
}

/// Address provider backed by a plain-text echo service
#[derive(Debug, Clone)]
pub struct EchoAddressProvider {
    /// Echo service URL
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl EchoAddressProvider {
    /// Create a new echo address provider
    ///
    /// # Parameters
    ///
    /// - `url`: URL answering with the caller's address (e.g., "https://api.ipify.org")
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: build_client(),
        }
    }

    async fn fetch_ip(&self) -> Result<Ipv4Addr> {
        let body = fetch_text(&self.client, "http", &self.url).await?;
        parse_ipv4("http", &body)
    }
}

#[async_trait::async_trait]
impl AddressProvider for EchoAddressProvider {
    async fn discover(&self) -> Address {
        match self.fetch_ip().await {
            Ok(ip) => Address::Known(ip),
            Err(e) => {
                tracing::warn!(url = %self.url, "Unable to determine IP address: {}", e);
                Address::Unknown
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating gateway address providers
pub struct GatewayFactory;

impl AddressProviderFactory for GatewayFactory {
    fn create(&self, config: &AddressSourceConfig) -> Result<Box<dyn AddressProvider>> {
        match config {
            AddressSourceConfig::Gateway { url } => {
                Ok(Box::new(GatewayAddressProvider::new(url.clone())))
            }
            _ => Err(Error::config("Invalid config for gateway address source")),
        }
    }
}

/// Factory for creating echo address providers
pub struct HttpFactory;

impl AddressProviderFactory for HttpFactory {
    fn create(&self, config: &AddressSourceConfig) -> Result<Box<dyn AddressProvider>> {
        match config {
            AddressSourceConfig::Http { url } => Ok(Box::new(EchoAddressProvider::new(url.clone()))),
            _ => Err(Error::config("Invalid config for HTTP address source")),
        }
    }
}

/// Register the gateway and echo address sources with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_address_provider("gateway", Box::new(GatewayFactory));
    registry.register_address_provider("http", Box::new(HttpFactory));
}
