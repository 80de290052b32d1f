// # Interface Address Provider
//
// This crate reads the addresses bound to a local network interface and
// reports the first IPv4 one.
//
// ## When to Use
//
// The interface must carry the public address itself, i.e. the host is the
// edge router or sits in the gateway's DMZ. Behind NAT use the gateway or
// echo backends from `ddns-ip-http` instead.
//
// ## Platform Support
//
// Addresses come from `if-addrs`, which covers Linux, the BSDs, macOS and
// Windows.

use ddns_core::config::AddressSourceConfig;
use ddns_core::traits::{Address, AddressProvider, AddressProviderFactory, first_ipv4};
use ddns_core::{Error, ProviderRegistry, Result};

use std::net::IpAddr;

/// Address provider backed by a local network interface
#[derive(Debug, Clone)]
pub struct InterfaceAddressProvider {
    interface: String,
}

impl InterfaceAddressProvider {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

#[async_trait::async_trait]
impl AddressProvider for InterfaceAddressProvider {
    async fn discover(&self) -> Address {
        match interface_addrs(&self.interface) {
            Ok(Some(addrs)) => {
                let address = first_ipv4(addrs);
                if address.is_unknown() {
                    tracing::warn!(
                        interface = %self.interface,
                        "Interface has no IPv4 address"
                    );
                }
                address
            }
            Ok(None) => {
                tracing::warn!(interface = %self.interface, "Interface not found");
                Address::Unknown
            }
            Err(e) => {
                tracing::warn!(
                    interface = %self.interface,
                    "Error obtaining addresses for interface: {}",
                    e
                );
                Address::Unknown
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "interface"
    }
}

/// List the addresses of `name` in listing order
///
/// Returns `Ok(None)` when no interface of that name exists.
fn interface_addrs(name: &str) -> std::io::Result<Option<Vec<IpAddr>>> {
    let addrs: Vec<IpAddr> = if_addrs::get_if_addrs()?
        .into_iter()
        .filter(|iface| iface.name == name)
        .map(|iface| iface.ip())
        .collect();

    // An interface without any address is indistinguishable from a missing one
    Ok((!addrs.is_empty()).then_some(addrs))
}

/// Factory for creating interface address providers
pub struct InterfaceFactory;

impl AddressProviderFactory for InterfaceFactory {
    fn create(&self, config: &AddressSourceConfig) -> Result<Box<dyn AddressProvider>> {
        match config {
            AddressSourceConfig::Interface { name } => {
                Ok(Box::new(InterfaceAddressProvider::new(name.trim())))
            }
            _ => Err(Error::config("Invalid config for interface address source")),
        }
    }
}

/// Register the interface address source with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_address_provider("interface", Box::new(InterfaceFactory));
}
