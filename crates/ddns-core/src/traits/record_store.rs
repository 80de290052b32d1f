// # Record Store Trait
//
// Defines the interface for reading and writing the domain's "A" record
// at the DNS provider.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::RecordStore;
//
// let store = /* RecordStore implementation */;
//
// let record = store.find_record("home.example.com").await?;
// if record.content != "203.0.113.7" {
//     store.update_record(&record.id, "203.0.113.7").await?;
// }
// ```

use async_trait::async_trait;

/// Record type managed by this system
pub const RECORD_TYPE_A: &str = "A";

/// Read snapshot of a remote DNS record
///
/// Owned by the provider. Fetched fresh for every reconciliation attempt and
/// never cached across ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-specific record identifier
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type ("A")
    pub record_type: String,
    /// Current record content (address string)
    pub content: String,
}

impl DnsRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        record_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            record_type: record_type.into(),
            content: content.into(),
        }
    }

    /// Build an "A" record snapshot
    pub fn a(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, name, RECORD_TYPE_A, content)
    }

    fn matches(&self, domain: &str) -> bool {
        self.record_type.eq_ignore_ascii_case(RECORD_TYPE_A)
            && self.name.trim_end_matches('.').eq_ignore_ascii_case(domain.trim_end_matches('.'))
    }
}

/// Pick the single "A" record for `domain` out of a provider listing
///
/// Records of other types or names are ignored. Zero matches is
/// [`Error::NotFound`](crate::Error::NotFound), more than one is
/// [`Error::Ambiguous`](crate::Error::Ambiguous): either is a configuration
/// problem on the provider side and is never resolved by guessing.
pub fn select_single_record<I>(records: I, domain: &str) -> crate::Result<DnsRecord>
where
    I: IntoIterator<Item = DnsRecord>,
{
    let mut matching: Vec<DnsRecord> = records.into_iter().filter(|r| r.matches(domain)).collect();

    match matching.len() {
        0 => Err(crate::Error::not_found(format!(
            "no A record for {}",
            domain
        ))),
        1 => Ok(matching.remove(0)),
        count => Err(crate::Error::ambiguous(domain, count)),
    }
}

/// Trait for DNS record store implementations
///
/// # Contract
///
/// - Authentication failures, network failures and provider error payloads
///   all surface as [`Error::Provider`](crate::Error::Provider) with a
///   human-readable message.
/// - No retries, no caching, at most one write per `update_record` call.
/// - Implementations never decide whether an update is needed; that is the
///   reconciler's job.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find the single "A" record for `domain`
    ///
    /// # Returns
    ///
    /// - `Ok(DnsRecord)`: exactly one record matched
    /// - `Err(Error::NotFound)`: no record matched
    /// - `Err(Error::Ambiguous)`: more than one record matched
    /// - `Err(Error::Provider)`: the lookup itself failed
    async fn find_record(&self, domain: &str) -> crate::Result<DnsRecord>;

    /// Replace the content of the record identified by `record_id`
    async fn update_record(&self, record_id: &str, content: &str) -> crate::Result<()>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores from configuration
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn RecordStore>, crate::Error>;
}
