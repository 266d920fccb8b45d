//! Worker-to-consumer event bridging.
//!
//! A probe session runs on a dedicated worker task that exclusively owns its
//! driver; the asynchronous consumer (a WebSocket handler) lives elsewhere.
//! The bridge relays [`ProbeEvent`]s between the two through an unbounded
//! single-producer/single-consumer channel: events arrive in the exact order
//! produced, with no reordering and no coalescing, and the consumer awaits on
//! reads rather than polling.
//!
//! Consumer disconnect propagates backwards: dropping the stream (or an
//! explicit [`ProbeStream::cancel`]) sets the session's [`StopSignal`]; the
//! worker observes it at its next cycle boundary and still runs compensation
//! before tearing down.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::probe::{EventSender, ProbeEvent, ProbeSession, StopSignal};

// ============================================================================
// ProbeStream
// ============================================================================

/// Consumer half of a streaming probe session.
pub struct ProbeStream {
    /// FIFO event channel from the worker.
    events: UnboundedReceiver<ProbeEvent>,
    /// The session's stop signal.
    stop: StopSignal,
    /// The worker task. Detached on drop — teardown always completes.
    worker: JoinHandle<()>,
}

impl ProbeStream {
    /// Awaits the next event; `None` once the worker is done and the channel
    /// is drained.
    pub async fn recv(&mut self) -> Option<ProbeEvent> {
        self.events.recv().await
    }

    /// Requests cooperative cancellation.
    #[inline]
    pub fn cancel(&self) {
        self.stop.set();
    }

    /// Handle to the session's stop signal.
    #[inline]
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Whether the worker has finished (compensation included).
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

impl Drop for ProbeStream {
    fn drop(&mut self) {
        // The receiver dies with us; make the cancellation explicit so the
        // worker stops probing instead of discovering it on a failed send.
        self.stop.set();
    }
}

// ============================================================================
// StreamBridge
// ============================================================================

/// Spawns probe sessions onto dedicated workers.
pub struct StreamBridge;

impl StreamBridge {
    /// Runs `session` on its own task, returning the consumer stream.
    ///
    /// The worker's result is already folded into the event sequence (a
    /// terminal `Complete`/`Error` event), so the task's own output is
    /// discarded.
    #[must_use]
    pub fn spawn(session: ProbeSession) -> ProbeStream {
        let stop = session.stop_signal();
        let (tx, events) = mpsc::unbounded_channel();
        let sender = EventSender::new(tx, stop.clone());

        let worker = tokio::spawn(async move {
            if let Err(e) = session.run(sender).await {
                debug!(error = %e, "Streaming session ended with error");
            }
        });

        ProbeStream {
            events,
            stop,
            worker,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dom::fake::{FakePage, FakeTier};
    use crate::probe::{EventInfo, ProbeConfig};

    use std::time::Duration;

    fn config() -> ProbeConfig {
        ProbeConfig::new("https://tickets.example/e/1").with_pace(Duration::from_millis(1))
    }

    fn page() -> FakePage {
        FakePage::builder()
            .info(EventInfo {
                title: Some("Concert".to_string()),
                ..Default::default()
            })
            .tier(FakeTier::open("35,00 €", "tickets_ticket_list_0_qty", 5).with_max_step(5))
            .build()
    }

    #[tokio::test]
    async fn test_events_arrive_in_order_with_single_terminator() {
        let page = page();
        let session = ProbeSession::new(Box::new(page.clone()), config());
        let mut stream = StreamBridge::spawn(session);

        let mut events = Vec::new();
        while let Some(event) = stream.recv().await {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(ProbeEvent::Info(_))));
        assert_eq!(
            events
                .iter()
                .filter(|e| e.is_terminal())
                .collect::<Vec<_>>()
                .len(),
            1
        );
        assert_eq!(events.last(), Some(&ProbeEvent::Complete));
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_but_still_compensates() {
        let page = FakePage::builder()
            .tier(FakeTier::open("20 €", "tickets_ticket_list_0_qty", 50).with_max_step(2))
            .build();
        let session = ProbeSession::new(Box::new(page.clone()), config());
        let mut stream = StreamBridge::spawn(session);
        let stop = stream.stop_signal();

        // Wait for the first reservation, then walk away.
        loop {
            match stream.recv().await {
                Some(ProbeEvent::TierUpdate { stock, .. }) if stock > 0 => break,
                Some(_) => {}
                None => panic!("worker ended before first update"),
            }
        }
        drop(stream);
        assert!(stop.is_set());

        // The detached worker still compensates and tears down.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !page.quit_called() {
            assert!(tokio::time::Instant::now() < deadline, "teardown never ran");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(page.held_reservations(), 0);
        assert_eq!(page.contexts_closed().len(), page.contexts_opened() + 1);
    }
}
