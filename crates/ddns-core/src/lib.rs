// # ddns-core
//
// Core library for the polling DDNS updater.
//
// ## Architecture Overview
//
// This library keeps one domain's "A" record in sync with a changing
// public IPv4 address:
// - **AddressProvider**: Trait for discovering the current address
// - **RecordStore**: Trait for reading and updating the DNS record
// - **Reconciler**: Fetch-then-conditionally-update against the record store
// - **DdnsEngine**: Bootstrap once, then poll on a fixed interval
// - **ProviderRegistry**: Backends selected by configuration
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from backends
// 2. **Polling**: One discovery per tick, one reconciliation at most
// 3. **Plugin-Based**: Backends are registered, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Minimal writes**: The remote record is re-read and only rewritten on mismatch

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{Address, AddressProvider, DnsRecord, RecordStore};
pub use engine::{DdnsEngine, EngineEvent, EngineState, Outcome, Reconciler, TickOutcome};
pub use registry::ProviderRegistry;
pub use config::{AddressSourceConfig, DdnsConfig, EngineConfig, ProviderConfig};
pub use error::{Error, Result};
