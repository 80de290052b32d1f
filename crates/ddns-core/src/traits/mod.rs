//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all backends implement.
//!
//! - [`AddressProvider`]: Discover the current public IPv4 address
//! - [`RecordStore`]: Read and update the domain's "A" record

pub mod address_provider;
pub mod record_store;

pub use address_provider::{Address, AddressProvider, AddressProviderFactory, first_ipv4};
pub use record_store::{
    DnsRecord, RECORD_TYPE_A, RecordStore, RecordStoreFactory, select_single_record,
};
