//! Configuration types for the DDNS system
//!
//! The configuration is built once at startup, validated, and then only
//! read. Nothing in the engine mutates it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default status endpoint of a home gateway on its LAN address
pub const DEFAULT_GATEWAY_URL: &str = "http://192.168.86.1/api/v1/status";

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Fully qualified domain whose "A" record is managed
    pub domain: String,

    /// Address discovery backend
    pub address: AddressSourceConfig,

    /// DNS provider backend
    pub provider: ProviderConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration with default engine settings
    pub fn new(
        domain: impl Into<String>,
        address: AddressSourceConfig,
        provider: ProviderConfig,
    ) -> Self {
        Self {
            domain: domain.into(),
            address,
            provider,
            engine: EngineConfig::default(),
        }
    }

    /// Replace the engine settings
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("No domain configured"));
        }

        self.address.validate()?;
        self.provider.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Address discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AddressSourceConfig {
    /// Read the first IPv4 address bound to a local network interface
    Interface {
        /// Interface name (e.g., "eth0", "re0")
        name: String,
    },

    /// Query a gateway's JSON status endpoint (`wan.online`, `wan.localIpAddress`)
    Gateway {
        /// Status URL
        #[serde(default = "default_gateway_url")]
        url: String,
    },

    /// Query an echo service that returns the caller's address as plain text
    Http {
        /// Echo service URL
        url: String,
    },

    /// Custom address provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl AddressSourceConfig {
    /// Validate the address source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            AddressSourceConfig::Interface { name } => {
                if name.trim().is_empty() {
                    return Err(crate::Error::config("Interface name cannot be empty"));
                }
                Ok(())
            }
            AddressSourceConfig::Gateway { url } | AddressSourceConfig::Http { url } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Address source URL cannot be empty"));
                }
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "Address source URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            AddressSourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom address source factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom address source config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the backend type name used for registry lookup
    pub fn type_name(&self) -> &str {
        match self {
            AddressSourceConfig::Interface { .. } => "interface",
            AddressSourceConfig::Gateway { .. } => "gateway",
            AddressSourceConfig::Http { .. } => "http",
            AddressSourceConfig::Custom { factory, .. } => factory,
        }
    }
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, looked up by zone name when absent)
        #[serde(default)]
        zone_id: Option<String>,
        /// Zone name (optional, derived from the domain when absent)
        #[serde(default)]
        zone_name: Option<String>,
        /// Record TTL in seconds; `None` leaves it to the provider ("automatic")
        #[serde(default)]
        ttl: Option<u32>,
        /// Whether the record is proxied; `None` leaves the current setting
        #[serde(default)]
        proxied: Option<bool>,
        /// Read the record but log the update instead of sending it
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, ttl, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if let Some(ttl) = ttl
                    && *ttl != 1
                    && !(60..=86400).contains(ttl)
                {
                    return Err(crate::Error::config(format!(
                        "Cloudflare TTL must be 1 (automatic) or between 60 and 86400 seconds. Got: {}",
                        ttl
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

// The API token must never reach a log line.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                zone_id,
                zone_name,
                ttl,
                proxied,
                dry_run,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .field("zone_name", zone_name)
                .field("ttl", ttl)
                .field("proxied", proxied)
                .field("dry_run", dry_run)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between steady-state ticks (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound for a single discovery or reconciliation (in seconds)
    ///
    /// A hung gateway or provider endpoint must not stall the tick loop.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloudflare(ttl: Option<u32>) -> ProviderConfig {
        ProviderConfig::Cloudflare {
            api_token: "secret-token".to_string(),
            zone_id: Some("zone".to_string()),
            zone_name: None,
            ttl,
            proxied: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_deserialize_tagged_config() {
        let json = serde_json::json!({
            "domain": "home.example.com",
            "address": { "type": "gateway" },
            "provider": { "type": "cloudflare", "api_token": "t", "zone_id": "z" },
            "engine": { "poll_interval_secs": 60 }
        });

        let config: DdnsConfig = serde_json::from_value(json).unwrap();
        assert!(matches!(
            config.address,
            AddressSourceConfig::Gateway { ref url } if url == DEFAULT_GATEWAY_URL
        ));
        assert_eq!(config.engine.poll_interval_secs, 60);
        assert_eq!(config.engine.request_timeout_secs, 10);
        assert!(matches!(
            config.provider,
            ProviderConfig::Cloudflare { dry_run: false, .. }
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_domain_rejected() {
        let config = DdnsConfig::new(
            " ",
            AddressSourceConfig::Interface {
                name: "eth0".to_string(),
            },
            cloudflare(None),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ttl_bounds() {
        assert!(cloudflare(None).validate().is_ok());
        assert!(cloudflare(Some(1)).validate().is_ok());
        assert!(cloudflare(Some(300)).validate().is_ok());
        assert!(cloudflare(Some(30)).validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let engine = EngineConfig {
            poll_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert!(engine.validate().is_err());
    }

    #[test]
    fn test_gateway_url_scheme() {
        let config = AddressSourceConfig::Gateway {
            url: "ftp://192.168.86.1/".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", cloudflare(None));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("REDACTED"));
    }
}
