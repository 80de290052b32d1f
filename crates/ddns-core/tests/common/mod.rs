//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the engine
//! talks to its backends without performing any real I/O.

#![allow(dead_code)]

use ddns_core::config::{AddressSourceConfig, DdnsConfig, EngineConfig, ProviderConfig};
use ddns_core::error::{Error, Result};
use ddns_core::traits::{
    Address, AddressProvider, DnsRecord, RecordStore, select_single_record,
};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DOMAIN: &str = "home.example.com";

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().expect("valid IPv4 literal")
}

/// An AddressProvider that replays a fixed script of discovery results
///
/// Once the script is exhausted the last entry repeats.
pub struct ScriptedAddressProvider {
    script: Arc<Mutex<VecDeque<Address>>>,
    last: Arc<Mutex<Address>>,
    discover_call_count: Arc<AtomicUsize>,
}

impl ScriptedAddressProvider {
    pub fn new(script: impl IntoIterator<Item = Address>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            last: Arc::new(Mutex::new(Address::Unknown)),
            discover_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Convenience constructor from address literals ("" means Unknown)
    pub fn from_strs(script: &[&str]) -> Self {
        Self::new(script.iter().map(|s| {
            if s.is_empty() {
                Address::Unknown
            } else {
                Address::Known(ip(s))
            }
        }))
    }

    /// Append further discovery results
    pub fn push(&self, address: Address) {
        self.script.lock().unwrap().push_back(address);
    }

    /// Get the number of times discover() was called
    pub fn discover_call_count(&self) -> usize {
        self.discover_call_count.load(Ordering::SeqCst)
    }

    /// Create a provider that shares script and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            script: Arc::clone(&other.script),
            last: Arc::clone(&other.last),
            discover_call_count: Arc::clone(&other.discover_call_count),
        }
    }
}

#[async_trait::async_trait]
impl AddressProvider for ScriptedAddressProvider {
    async fn discover(&self) -> Address {
        self.discover_call_count.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = next;
        }
        *last
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// An AddressProvider that never answers
pub struct HangingAddressProvider;

#[async_trait::async_trait]
impl AddressProvider for HangingAddressProvider {
    async fn discover(&self) -> Address {
        std::future::pending::<Address>().await
    }

    fn provider_name(&self) -> &'static str {
        "hanging"
    }
}

/// An in-memory RecordStore that tracks calls and can inject failures
pub struct MockRecordStore {
    records: Arc<Mutex<Vec<DnsRecord>>>,
    find_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    /// (record_id, content) of every update call
    updates: Arc<Mutex<Vec<(String, String)>>>,
    fail_find: Arc<AtomicBool>,
    fail_update: Arc<AtomicBool>,
    update_delay: Arc<Mutex<Option<std::time::Duration>>>,
}

impl MockRecordStore {
    /// A store holding a single "A" record for [`DOMAIN`]
    pub fn with_content(content: &str) -> Self {
        Self::with_records(vec![DnsRecord::a("rec-1", DOMAIN, content)])
    }

    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            find_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
            fail_find: Arc::new(AtomicBool::new(false)),
            fail_update: Arc::new(AtomicBool::new(false)),
            update_delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a store that shares records and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            find_call_count: Arc::clone(&other.find_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
            updates: Arc::clone(&other.updates),
            fail_find: Arc::clone(&other.fail_find),
            fail_update: Arc::clone(&other.fail_update),
            update_delay: Arc::clone(&other.update_delay),
        }
    }

    pub fn find_call_count(&self) -> usize {
        self.find_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }

    /// Current content of the record for [`DOMAIN`]
    pub fn content(&self) -> String {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == DOMAIN)
            .map(|r| r.content.clone())
            .unwrap_or_default()
    }

    /// Simulate an edit made outside this process
    pub fn set_content_externally(&self, content: &str) {
        for record in self.records.lock().unwrap().iter_mut() {
            if record.name == DOMAIN {
                record.content = content.to_string();
            }
        }
    }

    pub fn fail_find(&self, fail: bool) {
        self.fail_find.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn delay_updates(&self, delay: std::time::Duration) {
        *self.update_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait::async_trait]
impl RecordStore for MockRecordStore {
    async fn find_record(&self, domain: &str) -> Result<DnsRecord> {
        self.find_call_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_find.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "lookup refused"));
        }

        let records = self.records.lock().unwrap().clone();
        select_single_record(records, domain)
    }

    async fn update_record(&self, record_id: &str, content: &str) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.updates
            .lock()
            .unwrap()
            .push((record_id.to_string(), content.to_string()));

        let delay = *self.update_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "update refused"));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::not_found(record_id.to_string()))?;
        record.content = content.to_string();
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal DdnsConfig for testing
pub fn minimal_config(domain: &str) -> DdnsConfig {
    DdnsConfig::new(
        domain,
        AddressSourceConfig::Interface {
            name: "eth0".to_string(),
        },
        ProviderConfig::Cloudflare {
            api_token: "test-token".to_string(),
            zone_id: Some("zone".to_string()),
            zone_name: None,
            ttl: None,
            proxied: None,
            dry_run: false,
        },
    )
    .with_engine(EngineConfig {
        poll_interval_secs: 1,
        request_timeout_secs: 5,
        event_channel_capacity: 100,
    })
}
