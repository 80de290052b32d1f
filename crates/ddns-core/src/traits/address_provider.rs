// # Address Provider Trait
//
// Defines the interface for discovering the current public IPv4 address.
//
// ## Implementations
//
// - Network interface query: `ddns-ip-iface` crate
// - Gateway status endpoint / plain-text echo service: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{Address, AddressProvider};
//
// let provider = /* AddressProvider implementation */;
//
// match provider.discover().await {
//     Address::Known(ip) => println!("current address: {ip}"),
//     Address::Unknown => println!("address could not be determined"),
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Result of one discovery attempt
///
/// `Unknown` is the distinguished "indeterminate" value. It renders as the
/// empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Address {
    /// A dotted-quad IPv4 address
    Known(Ipv4Addr),
    /// The address could not be determined this attempt
    #[default]
    Unknown,
}

impl Address {
    /// Returns the address if known
    pub fn known(self) -> Option<Ipv4Addr> {
        match self {
            Address::Known(ip) => Some(ip),
            Address::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Address::Unknown)
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address::Known(ip)
    }
}

impl From<Option<Ipv4Addr>> for Address {
    fn from(ip: Option<Ipv4Addr>) -> Self {
        ip.map_or(Address::Unknown, Address::Known)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Known(ip) => write!(f, "{ip}"),
            Address::Unknown => Ok(()),
        }
    }
}

/// Select the first IPv4 entry of a multi-address listing
///
/// Interfaces usually carry both IPv4 and IPv6 addresses; only IPv4 is
/// relevant for an "A" record. Listing order is preserved.
pub fn first_ipv4<I>(addrs: I) -> Address
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(Address::Known(v4)),
            IpAddr::V6(_) => None,
        })
        .unwrap_or(Address::Unknown)
}

/// Trait for address provider implementations
///
/// # Contract
///
/// - Never fails past its caller: transient problems (unreachable gateway,
///   malformed response, link down) yield [`Address::Unknown`] and the cause
///   is reported through `tracing`.
/// - No internal retries. The engine's polling cadence is the retry policy.
/// - No caching. Every call performs a fresh read.
#[async_trait]
pub trait AddressProvider: Send + Sync {
    /// Discover the current public IPv4 address
    async fn discover(&self) -> Address;

    /// Backend name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing address providers from configuration
pub trait AddressProviderFactory: Send + Sync {
    /// Create an AddressProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::AddressSourceConfig,
    ) -> Result<Box<dyn AddressProvider>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_first_ipv4_skips_ipv6() {
        let addrs = vec![
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
        ];

        assert_eq!(
            first_ipv4(addrs),
            Address::Known(Ipv4Addr::new(203, 0, 113, 7))
        );
    }

    #[test]
    fn test_first_ipv4_without_ipv4_is_unknown() {
        let addrs = vec![IpAddr::V6(Ipv6Addr::LOCALHOST)];
        assert_eq!(first_ipv4(addrs), Address::Unknown);
        assert_eq!(first_ipv4(Vec::new()), Address::Unknown);
    }

    #[test]
    fn test_unknown_renders_empty() {
        assert_eq!(Address::Unknown.to_string(), "");
        assert_eq!(
            Address::Known(Ipv4Addr::new(1, 2, 3, 4)).to_string(),
            "1.2.3.4"
        );
    }
}
