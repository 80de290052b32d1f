//! Core DDNS engine
//!
//! The DdnsEngine owns the process lifetime and the only piece of mutable
//! state, the last known address. It is responsible for:
//! - Bootstrapping: one discovery plus one reconciliation, fatal on failure
//! - Steady state: one discovery per tick, reconciling only on change
//!
//! ## Architecture
//!
//! ```text
//!                  timer tick
//!                      │
//!                      ▼
//! ┌─────────────────┐      ┌──────────────┐      ┌─────────────┐
//! │ AddressProvider │ ───▶ │  DdnsEngine  │ ───▶ │ Reconciler  │
//! │   (discover)    │      │ (last known) │      └─────────────┘
//! └─────────────────┘      └──────────────┘             │
//!                                 │                     ▼
//!                                 ▼              ┌─────────────┐
//!                          ┌─────────────┐       │ RecordStore │
//!                          │   Events    │       │ (find/edit) │
//!                          └─────────────┘       └─────────────┘
//! ```
//!
//! ## State machine
//!
//! - **Bootstrapping** (once): `Unknown` address or a failed reconciliation
//!   is fatal, so the process never starts from an unreconciled state.
//! - **Steady** (every tick): `Unknown` skips the tick; an address equal to
//!   the last known one skips the tick without any remote read; otherwise
//!   reconcile, and only a confirmed outcome moves the last known address.

pub mod reconciler;

pub use reconciler::{Outcome, Reconciler};

use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::traits::{Address, AddressProvider, RecordStore};
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { domain: String },

    /// Bootstrap reconciled the record; steady state begins
    Bootstrapped { address: Ipv4Addr },

    /// Discovery returned no address
    AddressUnknown,

    /// Discovered address equals the last known one; no remote read
    AddressUnchanged { address: Ipv4Addr },

    /// Remote record already held the address
    RecordUnchanged { address: Ipv4Addr },

    /// Remote record was rewritten
    RecordUpdated { address: Ipv4Addr, previous: String },

    /// Reconciliation failed; will retry next tick
    ReconcileFailed { address: Ipv4Addr, error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Bootstrapping,
    Steady,
}

/// Result of one steady-state tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Discovery returned `Unknown`; the tick was skipped
    AddressUnknown,
    /// Address equals the last known one; the tick was skipped
    Unchanged,
    /// The address changed and reconciliation ran
    Attempted(Outcome),
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run_with_shutdown()`] (or drive [`bootstrap()`](Self::bootstrap)
///    and [`tick()`](Self::tick) directly)
/// 3. Engine runs until a shutdown signal is received or bootstrap fails
///
/// ## Threading
///
/// Single task, strictly sequential: one reconciliation at most is ever in
/// flight, and a slow tick delays the next one instead of queueing it.
pub struct DdnsEngine {
    /// Address discovery backend
    address_provider: Box<dyn AddressProvider>,

    /// DNS record backend
    record_store: Box<dyn RecordStore>,

    /// Managed domain
    domain: String,

    /// Interval between steady-state ticks
    poll_interval: Duration,

    /// Deadline for each remote call
    request_timeout: Duration,

    state: EngineState,

    /// Last address confirmed to match (or pushed to) the remote record
    last_known_address: Option<Ipv4Addr>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        address_provider: Box<dyn AddressProvider>,
        record_store: Box<dyn RecordStore>,
        config: &DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            address_provider,
            record_store,
            domain: config.domain.trim().to_string(),
            poll_interval: config.engine.poll_interval(),
            request_timeout: config.engine.request_timeout(),
            state: EngineState::Bootstrapping,
            last_known_address: None,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Override the tick interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the per-call deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn last_known_address(&self) -> Option<Ipv4Addr> {
        self.last_known_address
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Run the engine until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Bootstrap failed
    pub async fn run_with_shutdown(&mut self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.emit_event(EngineEvent::Started {
            domain: self.domain.clone(),
        });

        self.bootstrap().await?;

        // First tick one full interval after bootstrap; a late tick is
        // rescheduled from when it ran, never bunched up.
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        info!(domain = %self.domain, "Engine stopped");
        Ok(())
    }

    /// Bootstrapping state: discover once and reconcile once
    ///
    /// Both an `Unknown` address and a failed reconciliation are fatal.
    /// On success the engine is in [`EngineState::Steady`] with the last
    /// known address set. Calling this again once steady is a no-op.
    pub async fn bootstrap(&mut self) -> Result<Ipv4Addr> {
        if let (EngineState::Steady, Some(address)) = (self.state, self.last_known_address) {
            return Ok(address);
        }

        info!(
            domain = %self.domain,
            interval = ?self.poll_interval,
            source = self.address_provider.provider_name(),
            provider = self.record_store.provider_name(),
            "Starting DDNS updates"
        );

        let Some(address) = self.discover().await.known() else {
            error!(domain = %self.domain, "Unable to determine current IP address");
            self.emit_event(EngineEvent::AddressUnknown);
            return Err(Error::DiscoveryUnknown);
        };
        info!(address = %address, "Current IP");

        match self.reconcile(address).await {
            Outcome::Failed(e) => {
                error!(domain = %self.domain, address = %address, "Initial reconciliation failed: {}", e);
                self.emit_event(EngineEvent::ReconcileFailed {
                    address,
                    error: e.to_string(),
                });
                Err(e)
            }
            outcome => {
                self.record_outcome(address, &outcome);
                self.state = EngineState::Steady;
                self.emit_event(EngineEvent::Bootstrapped { address });
                Ok(address)
            }
        }
    }

    /// Steady state: one tick
    ///
    /// Never fails. Every failure is logged and leaves the last known
    /// address untouched so the next tick retries the same transition.
    pub async fn tick(&mut self) -> TickOutcome {
        let Some(address) = self.discover().await.known() else {
            warn!(domain = %self.domain, "Unable to determine IP address");
            self.emit_event(EngineEvent::AddressUnknown);
            return TickOutcome::AddressUnknown;
        };

        if self.last_known_address == Some(address) {
            debug!(domain = %self.domain, address = %address, "IP address unchanged");
            self.emit_event(EngineEvent::AddressUnchanged { address });
            return TickOutcome::Unchanged;
        }

        info!(
            domain = %self.domain,
            address = %address,
            previous = ?self.last_known_address,
            "IP address changed"
        );

        let outcome = self.reconcile(address).await;
        self.record_outcome(address, &outcome);

        info!(
            domain = %self.domain,
            address = %address,
            outcome = outcome.label(),
            "Tick complete"
        );
        TickOutcome::Attempted(outcome)
    }

    /// Apply a reconciliation outcome to the last known address
    fn record_outcome(&mut self, address: Ipv4Addr, outcome: &Outcome) {
        match outcome {
            Outcome::NoOp => {
                self.last_known_address = Some(address);
                self.emit_event(EngineEvent::RecordUnchanged { address });
            }
            Outcome::Updated { previous } => {
                self.last_known_address = Some(address);
                self.emit_event(EngineEvent::RecordUpdated {
                    address,
                    previous: previous.clone(),
                });
            }
            Outcome::Failed(e) => {
                self.emit_event(EngineEvent::ReconcileFailed {
                    address,
                    error: e.to_string(),
                });
            }
        }
    }

    /// One bounded discovery; a hung backend counts as `Unknown`
    async fn discover(&self) -> Address {
        match tokio::time::timeout(self.request_timeout, self.address_provider.discover()).await {
            Ok(address) => address,
            Err(_) => {
                warn!(
                    source = self.address_provider.provider_name(),
                    "Address discovery exceeded {:?}",
                    self.request_timeout
                );
                Address::Unknown
            }
        }
    }

    async fn reconcile(&self, address: Ipv4Addr) -> Outcome {
        Reconciler::new(self.record_store.as_ref(), &self.domain)
            .with_call_timeout(self.request_timeout)
            .reconcile(address)
            .await
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening; events are optional.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_equality() {
        let event = EngineEvent::RecordUpdated {
            address: Ipv4Addr::new(5, 6, 7, 8),
            previous: "1.2.3.4".to_string(),
        };

        assert_eq!(event.clone(), event);
        assert_ne!(event, EngineEvent::AddressUnknown);
    }
}
