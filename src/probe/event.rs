//! Incremental probe output: events and their sender half.
//!
//! A streaming session produces exactly one [`ProbeEvent::Info`] first (when
//! the page yields one), zero or more [`ProbeEvent::TierUpdate`]s per tier in
//! discovery order, and terminates with exactly one of
//! [`ProbeEvent::Complete`] / [`ProbeEvent::Error`] — never both, never
//! neither on a clean run.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::signal::StopSignal;

// ============================================================================
// EventInfo
// ============================================================================

/// Event-page metadata, read best-effort; absent pieces stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Event title.
    pub title: Option<String>,
    /// Displayed date.
    pub date: Option<String>,
    /// Displayed start time.
    pub time: Option<String>,
    /// Organizer name.
    pub organizer: Option<String>,
}

// ============================================================================
// ProbeEvent
// ============================================================================

/// Unit of the incremental output sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// Event-page metadata, emitted once before any tier update.
    Info(EventInfo),

    /// A tier's running total grew (or a sold-out tier reported its zero).
    TierUpdate {
        /// Tier display name.
        tier: String,
        /// Monotonically non-decreasing running total for that tier.
        stock: u32,
    },

    /// Session ran to completion with no carried error.
    Complete,

    /// Session failed; carries a human-readable message.
    Error(String),
}

impl ProbeEvent {
    /// Whether this event terminates the sequence.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error(_))
    }

    /// Renders the wire JSON shape consumed by streaming clients.
    ///
    /// | Event | Shape |
    /// |-------|-------|
    /// | `Info` | `{"event_info": {...}}` |
    /// | `TierUpdate` | `{"tier": name, "stock": total}` |
    /// | `Complete` | `{"__complete__": true}` |
    /// | `Error` | `{"__error__": message}` |
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Info(info) => json!({ "event_info": info }),
            Self::TierUpdate { tier, stock } => json!({ "tier": tier, "stock": stock }),
            Self::Complete => json!({ "__complete__": true }),
            Self::Error(message) => json!({ "__error__": message }),
        }
    }
}

// ============================================================================
// EventSender
// ============================================================================

/// Producer half of the incremental output sequence.
///
/// Batch sessions use [`EventSender::disabled`], which swallows every event.
/// A failed send means the consumer is gone: that sets the [`StopSignal`] so
/// the worker winds down at its next cycle boundary — this is how consumer
/// disconnect propagates back into the probe.
#[derive(Debug, Clone)]
pub struct EventSender {
    /// Channel to the consumer, `None` in batch mode.
    tx: Option<UnboundedSender<ProbeEvent>>,
    /// Signal set when the consumer disappears.
    stop: StopSignal,
}

impl EventSender {
    /// Creates a sender feeding a consumer channel.
    #[inline]
    #[must_use]
    pub fn new(tx: UnboundedSender<ProbeEvent>, stop: StopSignal) -> Self {
        Self { tx: Some(tx), stop }
    }

    /// Creates a sender that discards every event (batch mode).
    #[inline]
    #[must_use]
    pub fn disabled(stop: StopSignal) -> Self {
        Self { tx: None, stop }
    }

    /// Emits one event, best-effort.
    pub fn send(&self, event: ProbeEvent) {
        let Some(tx) = &self.tx else { return };
        if tx.send(event).is_err() {
            debug!("Event consumer disconnected; requesting stop");
            self.stop.set();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::mpsc;

    #[test]
    fn test_tier_update_json_shape() {
        let event = ProbeEvent::TierUpdate {
            tier: "Tier at 35€".to_string(),
            stock: 7,
        };
        assert_eq!(event.to_json(), json!({ "tier": "Tier at 35€", "stock": 7 }));
    }

    #[test]
    fn test_terminal_json_shapes() {
        assert_eq!(ProbeEvent::Complete.to_json(), json!({ "__complete__": true }));
        assert_eq!(
            ProbeEvent::Error("boom".to_string()).to_json(),
            json!({ "__error__": "boom" })
        );
    }

    #[test]
    fn test_info_json_carries_nulls() {
        let event = ProbeEvent::Info(EventInfo {
            title: Some("Concert".to_string()),
            ..Default::default()
        });
        let value = event.to_json();
        assert_eq!(value["event_info"]["title"], "Concert");
        assert!(value["event_info"]["organizer"].is_null());
    }

    #[test]
    fn test_is_terminal() {
        assert!(ProbeEvent::Complete.is_terminal());
        assert!(ProbeEvent::Error("x".to_string()).is_terminal());
        assert!(!ProbeEvent::Info(EventInfo::default()).is_terminal());
    }

    #[test]
    fn test_send_failure_sets_stop() {
        let stop = StopSignal::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = EventSender::new(tx, stop.clone());
        drop(rx);

        sender.send(ProbeEvent::Complete);

        assert!(stop.is_set());
    }

    #[test]
    fn test_disabled_sender_is_inert() {
        let stop = StopSignal::new();
        let sender = EventSender::disabled(stop.clone());

        sender.send(ProbeEvent::Complete);

        assert!(!stop.is_set());
    }
}
