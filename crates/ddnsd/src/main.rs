// # ddnsd - DDNS Daemon
//
// This daemon is a thin integration layer. All reconciliation logic lives in
// ddns-core; the daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering address sources and record stores
// 4. Running the DDNS engine until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Record
// - `DDNS_DOMAIN`: Fully qualified domain whose "A" record is kept in sync
//
// ### Address Source
// - `DDNS_ADDRESS_SOURCE`: interface, gateway (default) or http
// - `DDNS_INTERFACE`: Network interface (for interface)
// - `DDNS_GATEWAY_URL`: Gateway status URL (for gateway, optional)
// - `DDNS_HTTP_URL`: Echo service URL (for http)
//
// ### DNS Provider
// - `DDNS_PROVIDER_TYPE`: Provider type (cloudflare)
// - `DDNS_PROVIDER_API_TOKEN`: API token
// - `DDNS_PROVIDER_ZONE_ID`: Zone ID (optional)
// - `DDNS_PROVIDER_ZONE_NAME`: Zone name (optional)
// - `DDNS_PROVIDER_TTL`: "auto" (default) or seconds
// - `DDNS_PROVIDER_PROXIED`: true/false (optional)
//
// ### Engine
// - `DDNS_POLL_INTERVAL_SECS`: Seconds between polls (default 300)
// - `DDNS_REQUEST_TIMEOUT_SECS`: Deadline for each remote call (default 10)
// - `DDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
// - `DDNS_MODE=dry-run`: Read the record but never write it
//
// ## Example
//
// ```bash
// export DDNS_DOMAIN=home.example.com
// export DDNS_ADDRESS_SOURCE=interface
// export DDNS_INTERFACE=eth0
// export DDNS_PROVIDER_TYPE=cloudflare
// export DDNS_PROVIDER_API_TOKEN=your_token
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::config::DEFAULT_GATEWAY_URL;
use ddns_core::{AddressSourceConfig, DdnsConfig, DdnsEngine, EngineConfig, ProviderConfig};
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
/// - 3: The first discovery or reconciliation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
    /// Bootstrap failed: address unknown or record could not be reconciled
    BootstrapFailure = 3,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
///
/// Not `Debug`: holds the API token.
struct Config {
    domain: String,
    address_source: String,
    interface: Option<String>,
    gateway_url: Option<String>,
    http_url: Option<String>,
    provider_type: String,
    provider_api_token: String,
    provider_zone_id: Option<String>,
    provider_zone_name: Option<String>,
    provider_ttl: Option<u32>,
    provider_proxied: Option<bool>,
    poll_interval_secs: u64,
    request_timeout_secs: u64,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, treating empty values as unset
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider_ttl = match get("DDNS_PROVIDER_TTL") {
            None => None,
            Some(v) if v.eq_ignore_ascii_case("auto") => None,
            Some(v) => Some(
                v.parse::<u32>()
                    .with_context(|| format!("DDNS_PROVIDER_TTL must be 'auto' or seconds. Got: {}", v))?,
            ),
        };

        let provider_proxied = get("DDNS_PROVIDER_PROXIED")
            .map(|v| parse_bool("DDNS_PROVIDER_PROXIED", &v))
            .transpose()?;

        let poll_interval_secs = get("DDNS_POLL_INTERVAL_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .with_context(|| format!("DDNS_POLL_INTERVAL_SECS is not a number: {}", v))
            })
            .transpose()?
            .unwrap_or(EngineConfig::default().poll_interval_secs);

        let request_timeout_secs = get("DDNS_REQUEST_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .with_context(|| format!("DDNS_REQUEST_TIMEOUT_SECS is not a number: {}", v))
            })
            .transpose()?
            .unwrap_or(EngineConfig::default().request_timeout_secs);

        Ok(Self {
            domain: get("DDNS_DOMAIN").unwrap_or_default(),
            address_source: get("DDNS_ADDRESS_SOURCE")
                .unwrap_or_else(|| "gateway".to_string())
                .to_lowercase(),
            interface: get("DDNS_INTERFACE"),
            gateway_url: get("DDNS_GATEWAY_URL"),
            http_url: get("DDNS_HTTP_URL"),
            provider_type: get("DDNS_PROVIDER_TYPE")
                .unwrap_or_else(|| "cloudflare".to_string())
                .to_lowercase(),
            provider_api_token: get("DDNS_PROVIDER_API_TOKEN").unwrap_or_default(),
            provider_zone_id: get("DDNS_PROVIDER_ZONE_ID"),
            provider_zone_name: get("DDNS_PROVIDER_ZONE_NAME"),
            provider_ttl,
            provider_proxied,
            poll_interval_secs,
            request_timeout_secs,
            dry_run: get("DDNS_MODE").is_some_and(|m| m.eq_ignore_ascii_case("dry-run")),
            log_level: get("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs validation including:
    /// - Required field presence
    /// - Value format validation (API tokens, domain names, URLs)
    /// - Numeric range validation
    /// - Type enumeration validation
    fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            anyhow::bail!(
                "DDNS_DOMAIN is required. \
                Set it via: export DDNS_DOMAIN=home.example.com"
            );
        }
        validate_domain_name(&self.domain)?;

        // Validate API token presence and format
        if self.provider_api_token.is_empty() {
            anyhow::bail!(
                "DDNS_PROVIDER_API_TOKEN is required. \
                Set it via: export DDNS_PROVIDER_API_TOKEN=your_token"
            );
        }

        // Cloudflare API tokens are typically 40 characters alphanumeric
        if self.provider_api_token.len() < 20 {
            anyhow::bail!(
                "DDNS_PROVIDER_API_TOKEN appears too short ({} chars). \
                Cloudflare tokens are typically 40 characters. \
                Verify your token is correct.",
                self.provider_api_token.len()
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.provider_api_token.to_lowercase();
        if token_lower.contains("your_token") || token_lower.contains("replace_me") {
            anyhow::bail!(
                "DDNS_PROVIDER_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your DNS provider."
            );
        }

        match self.provider_type.as_str() {
            "cloudflare" => {}
            _ => anyhow::bail!(
                "DDNS_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare",
                self.provider_type
            ),
        }

        match self.address_source.as_str() {
            "interface" => {
                if self.interface.is_none() {
                    anyhow::bail!(
                        "DDNS_INTERFACE is required when DDNS_ADDRESS_SOURCE=interface"
                    );
                }
            }
            "gateway" => {
                if let Some(ref url) = self.gateway_url {
                    validate_url("DDNS_GATEWAY_URL", url)?;
                }
            }
            "http" => match self.http_url {
                Some(ref url) => validate_url("DDNS_HTTP_URL", url)?,
                None => anyhow::bail!("DDNS_HTTP_URL is required when DDNS_ADDRESS_SOURCE=http"),
            },
            _ => anyhow::bail!(
                "DDNS_ADDRESS_SOURCE '{}' is not supported. \
                Supported sources: interface, gateway, http",
                self.address_source
            ),
        }

        if !(10..=86400).contains(&self.poll_interval_secs) {
            anyhow::bail!(
                "DDNS_POLL_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                self.poll_interval_secs
            );
        }

        if !(1..=300).contains(&self.request_timeout_secs) {
            anyhow::bail!(
                "DDNS_REQUEST_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.request_timeout_secs
            );
        }

        if log_level(&self.log_level).is_none() {
            anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        self.to_ddns_config().validate()?;
        Ok(())
    }

    /// Build the core configuration
    fn to_ddns_config(&self) -> DdnsConfig {
        let address = match self.address_source.as_str() {
            "interface" => AddressSourceConfig::Interface {
                name: self.interface.clone().unwrap_or_default(),
            },
            "http" => AddressSourceConfig::Http {
                url: self.http_url.clone().unwrap_or_default(),
            },
            _ => AddressSourceConfig::Gateway {
                url: self
                    .gateway_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            },
        };

        let provider = ProviderConfig::Cloudflare {
            api_token: self.provider_api_token.clone(),
            zone_id: self.provider_zone_id.clone(),
            zone_name: self.provider_zone_name.clone(),
            ttl: self.provider_ttl,
            proxied: self.provider_proxied,
            dry_run: self.dry_run,
        };

        let engine = EngineConfig {
            poll_interval_secs: self.poll_interval_secs,
            request_timeout_secs: self.request_timeout_secs,
            ..EngineConfig::default()
        };

        DdnsConfig::new(self.domain.trim_end_matches('.'), address, provider).with_engine(engine)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
    }
}

fn log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn validate_url(key: &str, url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        anyhow::bail!("{} must use HTTP or HTTPS scheme. Got: {}", key, url);
    }
    Ok(())
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// It's not comprehensive but catches common errors. A single trailing dot
/// (fully qualified form) is accepted.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    if !domain.contains('.') {
        anyhow::bail!("Domain name must be fully qualified. Got: '{}'", domain);
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let level = log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config).await {
            Ok(code) => code,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Build the registry with every compiled-in backend
fn build_registry() -> ddns_core::ProviderRegistry {
    let registry = ddns_core::ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    ddns_provider_cloudflare::register(&registry);

    #[cfg(feature = "iface")]
    ddns_ip_iface::register(&registry);

    #[cfg(feature = "http")]
    ddns_ip_http::register(&registry);

    debug!(
        address_sources = ?registry.list_address_providers(),
        record_stores = ?registry.list_record_stores(),
        "Registered backends"
    );

    registry
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<DdnsExitCode> {
    let ddns_config = config.to_ddns_config();

    info!(
        domain = %ddns_config.domain,
        source = ddns_config.address.type_name(),
        provider = ddns_config.provider.type_name(),
        interval_secs = ddns_config.engine.poll_interval_secs,
        "Configuration loaded"
    );

    let registry = build_registry();

    let components = registry
        .create_address_provider(&ddns_config.address)
        .and_then(|source| {
            registry
                .create_record_store(&ddns_config.provider)
                .map(|store| (source, store))
        })
        .and_then(|(source, store)| DdnsEngine::new(source, store, &ddns_config));

    let (mut engine, mut event_rx) = match components {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to set up engine: {}", e);
            return Ok(DdnsExitCode::ConfigError);
        }
    };

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "Engine event");
        }
    });

    let shutdown = shutdown_signal()?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let signal_task = tokio::spawn(async move {
        let signal = shutdown.await;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
    });

    let result = engine.run_with_shutdown(shutdown_rx).await;
    signal_task.abort();

    match result {
        Ok(()) => {
            info!("Shutting down daemon");
            Ok(DdnsExitCode::CleanShutdown)
        }
        Err(e) => {
            error!(domain = %engine.domain(), "Bootstrap failed: {}", e);
            Ok(DdnsExitCode::BootstrapFailure)
        }
    }
}

/// Install handlers for shutdown signals (SIGTERM, SIGINT)
///
/// Returns a future resolving to the name of the first signal received.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Install a handler for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}
