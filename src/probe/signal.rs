//! Cooperative cancellation flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

// ============================================================================
// StopSignal
// ============================================================================

/// One-way, process-wide-per-session cancellation flag.
///
/// Set by consumer disconnect, an explicit cancel request, or an
/// unrecoverable error. Once set it is never cleared; the probe reads it at
/// cycle boundaries only (an in-flight wait or click is never interrupted),
/// and session teardown — compensation included — still runs after it is set.
///
/// Clones share the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates an unset signal.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal. Idempotent.
    pub fn set(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            debug!("Stop signal set");
        }
    }

    /// Whether the signal has been set.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unset() {
        assert!(!StopSignal::new().is_set());
    }

    #[test]
    fn test_set_is_sticky_and_shared() {
        let signal = StopSignal::new();
        let clone = signal.clone();

        clone.set();
        clone.set();

        assert!(signal.is_set());
        assert!(clone.is_set());
    }
}
