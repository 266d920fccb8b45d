//! Reservation bookkeeping.
//!
//! Every reservation the prober makes is recorded here, independent of which
//! tier produced it. The ledger is append-only during probing; the
//! compensation sweep drains it exactly once at session end. No handle is
//! ever silently dropped — a dropped handle would be a leaked reservation on
//! the target system.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::debug;

use crate::identifiers::ContextId;

// ============================================================================
// ReservationHandle
// ============================================================================

/// One held reservation awaiting compensation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationHandle {
    /// Browsing context the reservation was made in.
    pub context: ContextId,
    /// Owning tier's display name. Diagnostics only — never used to
    /// re-derive quantity.
    pub tier: String,
}

impl ReservationHandle {
    /// Creates a handle for a reservation held in `context`.
    #[inline]
    pub fn new(context: ContextId, tier: impl Into<String>) -> Self {
        Self {
            context,
            tier: tier.into(),
        }
    }
}

// ============================================================================
// ReservationLedger
// ============================================================================

/// Append-only registry of every reservation made during a session.
#[derive(Debug, Default)]
pub struct ReservationLedger {
    /// Recorded handles, in reservation order.
    handles: Mutex<Vec<ReservationHandle>>,
}

impl ReservationLedger {
    /// Creates an empty ledger.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one reservation.
    pub fn record(&self, handle: ReservationHandle) {
        debug!(context = %handle.context, tier = %handle.tier, "Reservation ledgered");
        self.handles.lock().push(handle);
    }

    /// Takes every handle recorded so far, in reservation order.
    ///
    /// Called exactly once, by the compensation sweep; there is no
    /// partial drain and no priority ordering.
    #[must_use]
    pub fn drain(&self) -> Vec<ReservationHandle> {
        std::mem::take(&mut *self.handles.lock())
    }

    /// Number of handles currently recorded.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    /// Whether no reservation has been recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(tier: &str) -> ReservationHandle {
        ReservationHandle::new(ContextId::random(), tier)
    }

    #[test]
    fn test_record_and_drain_preserve_order() {
        let ledger = ReservationLedger::new();
        ledger.record(handle("A"));
        ledger.record(handle("A"));
        ledger.record(handle("B"));

        let drained = ledger.drain();
        assert_eq!(
            drained.iter().map(|h| h.tier.as_str()).collect::<Vec<_>>(),
            ["A", "A", "B"]
        );
    }

    #[test]
    fn test_drain_empties_the_ledger() {
        let ledger = ReservationLedger::new();
        ledger.record(handle("A"));

        assert_eq!(ledger.drain().len(), 1);
        assert!(ledger.is_empty());
        assert!(ledger.drain().is_empty());
    }

    #[test]
    fn test_len() {
        let ledger = ReservationLedger::new();
        assert_eq!(ledger.len(), 0);
        ledger.record(handle("A"));
        assert_eq!(ledger.len(), 1);
    }
}
