//! Probe session orchestration.
//!
//! One [`ProbeSession`] owns one driver session and drives it through the
//! state machine
//!
//! ```text
//! Idle → Discovering → Probing(0) → … → Probing(n) → Completing → Terminated
//! ```
//!
//! with an immediate jump to `Completing` when the stop signal is observed or
//! a failure escalates out of discovery/probing (the error is carried
//! forward, not thrown away). `Completing → Terminated` always runs the
//! compensation sweep over whatever the ledger holds, closes the control
//! context and quits the driver — the same single exit path for normal
//! completion, cancellation and failure.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::dom::DomDriver;
use crate::error::Result;
use crate::probe::prober::StockProber;
use crate::probe::sweep::{CompensationSweep, SweepReport};
use crate::probe::tier::{Tier, TierCatalog};

use super::config::ProbeConfig;
use super::event::{EventInfo, EventSender, ProbeEvent};
use super::ledger::ReservationLedger;
use super::signal::StopSignal;

// ============================================================================
// SessionState
// ============================================================================

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet started.
    Idle,
    /// Running tier discovery.
    Discovering,
    /// Probing the tier at this discovery index.
    Probing(usize),
    /// Running compensation and teardown.
    Completing,
    /// Driver quit; nothing further happens.
    Terminated,
}

// ============================================================================
// ProbeReport
// ============================================================================

/// Aggregate outcome of one session.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Event-page metadata.
    pub info: EventInfo,
    /// Tiers with their final verified stock, in discovery order.
    pub tiers: Vec<Tier>,
    /// Compensation outcome; `abandoned > 0` means inventory stayed held on
    /// the target system.
    pub sweep: SweepReport,
}

impl ProbeReport {
    /// Final totals keyed by tier name.
    #[must_use]
    pub fn stock_by_tier(&self) -> FxHashMap<String, u32> {
        self.tiers
            .iter()
            .map(|t| (t.name.clone(), t.stock))
            .collect()
    }
}

// ============================================================================
// ProbeSession
// ============================================================================

/// Orchestrates discovery, per-tier probing and compensation for one target.
///
/// The session exclusively owns its driver; all driver calls happen on the
/// worker that runs [`run`](Self::run).
pub struct ProbeSession {
    /// Exclusively owned driver session.
    driver: Box<dyn DomDriver>,
    /// Session configuration.
    config: ProbeConfig,
    /// Cooperative cancellation flag shared with the boundary layer.
    stop: StopSignal,
    /// Registry of every reservation made.
    ledger: ReservationLedger,
    /// Lifecycle position, for logs.
    state: SessionState,
}

impl ProbeSession {
    /// Creates an idle session.
    #[must_use]
    pub fn new(driver: Box<dyn DomDriver>, config: ProbeConfig) -> Self {
        Self {
            driver,
            config,
            stop: StopSignal::new(),
            ledger: ReservationLedger::new(),
            state: SessionState::Idle,
        }
    }

    /// Returns a handle to this session's stop signal.
    #[inline]
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Moves to the next lifecycle state.
    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Session transition");
        self.state = next;
    }

    /// Runs the session in batch mode: no incremental events, no
    /// cancellation, always to natural completion.
    pub async fn run_batch(self) -> Result<ProbeReport> {
        let events = EventSender::disabled(self.stop.clone());
        self.run(events).await
    }

    /// Runs the session, emitting incremental events as produced.
    ///
    /// Whatever `drive` returns, compensation and teardown run before the
    /// terminal event is emitted: `Complete` when no error was carried,
    /// `Error` otherwise.
    pub async fn run(mut self, events: EventSender) -> Result<ProbeReport> {
        let outcome = self.drive(&events).await;

        self.transition(SessionState::Completing);
        let sweep = CompensationSweep::new(self.driver.as_ref(), self.config.wait_timeout)
            .compensate(self.ledger.drain())
            .await;

        let control = self.driver.initial_context();
        if let Err(e) = self.driver.close_context(&control).await {
            debug!(error = %e, "Control context close failed during teardown");
        }
        if let Err(e) = self.driver.quit().await {
            warn!(error = %e, "Driver quit failed during teardown");
        }
        self.transition(SessionState::Terminated);

        match outcome {
            Ok((info, tiers)) => {
                info!(
                    tiers = tiers.len(),
                    total = tiers.iter().map(|t| t.stock).sum::<u32>(),
                    "Probe session complete"
                );
                events.send(ProbeEvent::Complete);
                Ok(ProbeReport { info, tiers, sweep })
            }
            Err(e) => {
                warn!(error = %e, "Probe session failed");
                events.send(ProbeEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Discovery plus per-tier probing; errors escalate to the caller, which
    /// still finalizes.
    async fn drive(&mut self, events: &EventSender) -> Result<(EventInfo, Vec<Tier>)> {
        self.transition(SessionState::Discovering);
        let control = self.driver.initial_context();
        let catalog = TierCatalog::new(self.driver.as_ref(), &control, &self.config);

        let mut tiers = catalog.discover().await?;
        let info = catalog.event_info().await;
        events.send(ProbeEvent::Info(info.clone()));

        for index in 0..tiers.len() {
            if self.stop.is_set() {
                debug!(next_tier = index, "Stop observed before next tier");
                break;
            }
            self.transition(SessionState::Probing(index));
            debug!(index, tier = %tiers[index].name, "Probing tier");
            let prober = StockProber::new(self.driver.as_ref(), &self.config, control.clone());
            prober
                .probe(&mut tiers[index], &self.ledger, &self.stop, events)
                .await?;
        }

        Ok((info, tiers))
    }
}

// ============================================================================
// Tests
// ============================================================================
