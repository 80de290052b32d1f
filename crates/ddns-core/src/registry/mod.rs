//! Plugin-based backend registry
//!
//! The registry allows address providers and record stores to be
//! registered at startup and selected by configuration, avoiding
//! hardcoded if-else chains over backend types.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! ddns_provider_cloudflare::register(&registry);
//! ddns_ip_http::register(&registry);
//!
//! let address_provider = registry.create_address_provider(&config.address)?;
//! let record_store = registry.create_record_store(&config.provider)?;
//! ```

use crate::config::{AddressSourceConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{AddressProvider, AddressProviderFactory, RecordStore, RecordStoreFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry for plugin-based backend creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered record store factories
    record_stores: RwLock<HashMap<String, Box<dyn RecordStoreFactory>>>,

    /// Registered address provider factories
    address_providers: RwLock<HashMap<String, Box<dyn AddressProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "cloudflare")
    /// - `factory`: Factory object for creating store instances
    pub fn register_record_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RecordStoreFactory>,
    ) {
        let mut stores = self
            .record_stores
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stores.insert(name.into(), factory);
    }

    /// Register an address provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Backend type name (e.g., "interface", "gateway", "http")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_address_provider(
        &self,
        name: impl Into<String>,
        factory: Box<dyn AddressProviderFactory>,
    ) {
        let mut providers = self
            .address_providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(name.into(), factory);
    }

    /// Create a record store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RecordStore>)`: Created store instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_record_store(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
        let provider_type = config.type_name();
        let stores = self
            .record_stores
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = stores
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Create an address provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn AddressProvider>)`: Created provider instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_address_provider(
        &self,
        config: &AddressSourceConfig,
    ) -> Result<Box<dyn AddressProvider>> {
        let source_type = config.type_name();
        let providers = self
            .address_providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = providers.get(source_type).ok_or_else(|| {
            Error::config(format!("Unknown address source type: {}", source_type))
        })?;

        factory.create(config)
    }

    /// List all registered record store types
    pub fn list_record_stores(&self) -> Vec<String> {
        let stores = self
            .record_stores
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stores.keys().cloned().collect()
    }

    /// List all registered address provider types
    pub fn list_address_providers(&self) -> Vec<String> {
        let providers = self
            .address_providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.keys().cloned().collect()
    }

    /// Check if a record store type is registered
    pub fn has_record_store(&self, name: &str) -> bool {
        let stores = self
            .record_stores
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stores.contains_key(name)
    }

    /// Check if an address provider type is registered
    pub fn has_address_provider(&self, name: &str) -> bool {
        let providers = self
            .address_providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Address;

    struct FixedAddress;

    #[async_trait::async_trait]
    impl AddressProvider for FixedAddress {
        async fn discover(&self) -> Address {
            Address::Known(std::net::Ipv4Addr::new(192, 0, 2, 1))
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FixedFactory;

    impl AddressProviderFactory for FixedFactory {
        fn create(&self, _config: &AddressSourceConfig) -> Result<Box<dyn AddressProvider>> {
            Ok(Box::new(FixedAddress))
        }
    }

    struct MockStoreFactory;

    impl RecordStoreFactory for MockStoreFactory {
        fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
            Err(Error::not_found("Mock store not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ProviderRegistry::new();

        // Initially empty
        assert!(!registry.has_record_store("mock"));

        // Register
        registry.register_record_store("mock", Box::new(MockStoreFactory));

        // Now present
        assert!(registry.has_record_store("mock"));
        assert!(registry.list_record_stores().contains(&"mock".to_string()));
    }

    #[tokio::test]
    async fn test_create_address_provider_by_type() {
        let registry = ProviderRegistry::new();
        registry.register_address_provider("fixed", Box::new(FixedFactory));

        let config = AddressSourceConfig::Custom {
            factory: "fixed".to_string(),
            config: serde_json::json!({}),
        };
        let provider = registry.create_address_provider(&config).unwrap();
        assert_eq!(
            provider.discover().await,
            Address::Known(std::net::Ipv4Addr::new(192, 0, 2, 1))
        );
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let registry = ProviderRegistry::new();
        let config = AddressSourceConfig::Interface {
            name: "eth0".to_string(),
        };

        let err = registry.create_address_provider(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
