//! Record reconciliation
//!
//! Compares a desired address against the remote record and writes only
//! when they differ:
//!
//! 1. `find_record(domain)`; on failure return [`Outcome::Failed`]
//! 2. record content equals the address → [`Outcome::NoOp`], no write
//! 3. otherwise `update_record(id, address)` → [`Outcome::Updated`] or
//!    [`Outcome::Failed`]
//!
//! The remote record is always re-read before writing, so an external edit
//! between ticks is observed instead of overwritten blindly from a local
//! cache.

use crate::error::Error;
use crate::traits::RecordStore;
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of one reconciliation attempt
#[derive(Debug)]
pub enum Outcome {
    /// The record already held the address; nothing was written
    NoOp,
    /// The record was rewritten
    Updated {
        /// Record content before the write
        previous: String,
    },
    /// Lookup or write failed; the remote record state is unknown
    Failed(Error),
}

impl Outcome {
    /// Short label for log fields
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::NoOp => "no-op",
            Outcome::Updated { .. } => "updated",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// Reconciles one domain's "A" record against a [`RecordStore`]
pub struct Reconciler<'a> {
    store: &'a dyn RecordStore,
    domain: &'a str,
    /// Deadline for each individual store call
    call_timeout: Option<Duration>,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn RecordStore, domain: &'a str) -> Self {
        Self {
            store,
            domain,
            call_timeout: None,
        }
    }

    /// Bound every `find_record` / `update_record` call by `timeout`
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> crate::Result<T>
    where
        F: Future<Output = crate::Result<T>>,
    {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                Error::timeout(format!(
                    "{} for {} exceeded {:?}",
                    op, self.domain, limit
                ))
            })?,
            None => fut.await,
        }
    }

    /// Bring the remote record in line with `address`
    ///
    /// Never returns an error: every failure is folded into
    /// [`Outcome::Failed`] so the caller decides how fatal it is.
    pub async fn reconcile(&self, address: Ipv4Addr) -> Outcome {
        let desired = address.to_string();

        let record = match self
            .bounded("find_record", self.store.find_record(self.domain))
            .await
        {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    domain = self.domain,
                    provider = self.store.provider_name(),
                    provider_failure = e.is_provider_failure(),
                    "Error getting DNS record: {}",
                    e
                );
                return Outcome::Failed(e);
            }
        };

        if record.content == desired {
            debug!(
                domain = self.domain,
                address = %desired,
                "DNS record matches current IP"
            );
            return Outcome::NoOp;
        }

        match self
            .bounded("update_record", self.store.update_record(&record.id, &desired))
            .await
        {
            Ok(()) => {
                info!(
                    domain = self.domain,
                    address = %desired,
                    previous = %record.content,
                    "Successfully updated DNS record"
                );
                Outcome::Updated {
                    previous: record.content,
                }
            }
            Err(e) => {
                warn!(
                    domain = self.domain,
                    address = %desired,
                    provider = self.store.provider_name(),
                    provider_failure = e.is_provider_failure(),
                    "Error updating DNS record: {}",
                    e
                );
                Outcome::Failed(e)
            }
        }
    }
}
