//! The inventory-probing-and-compensation engine.
//!
//! Measuring remaining stock on a page without a stock API is a
//! side-effecting measurement: every read is a real reservation that must be
//! compensated afterwards. The engine discovers tiers, probes each one
//! through simulated reservations distributed across isolated browsing
//! contexts, and guarantees that every reservation made is presented to the
//! compensation sweep exactly once — on success, cancellation and failure
//! alike.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`ProbeConfig`] session tuning |
//! | `event` | [`ProbeEvent`] incremental output + [`EventSender`] |
//! | `ledger` | [`ReservationLedger`] reservation bookkeeping |
//! | `prober` | [`StockProber`] reserve-and-measure loop |
//! | `selectors` | CSS anchors on the target page |
//! | `session` | [`ProbeSession`] orchestration state machine |
//! | `signal` | [`StopSignal`] cooperative cancellation |
//! | `sweep` | [`CompensationSweep`] guaranteed rollback |
//! | `tier` | [`Tier`] / [`TierCatalog`] discovery |

// ============================================================================
// Submodules
// ============================================================================

mod config;
mod ledger;
mod prober;
mod session;
mod signal;
mod sweep;
mod tier;

/// Incremental probe output events.
pub mod event;

/// CSS anchors on the target ticketing page.
pub mod selectors;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::ProbeConfig;
pub use event::{EventInfo, EventSender, ProbeEvent};
pub use ledger::{ReservationHandle, ReservationLedger};
pub use prober::StockProber;
pub use session::{ProbeReport, ProbeSession, SessionState};
pub use signal::StopSignal;
pub use sweep::{CompensationSweep, SweepReport};
pub use tier::{Tier, TierCatalog};
