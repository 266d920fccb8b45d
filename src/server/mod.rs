//! HTTP/WebSocket boundary.
//!
//! Two entry points share the probe engine:
//!
//! - `POST /probe` — batch: runs a full session and returns the aggregate.
//! - `GET /ws/probe` — streaming: relays incremental events as produced and
//!   treats remote closure as a cancellation request.
//!
//! The state holds a [`DriverFactory`], never a driver: every request gets a
//! fresh, exclusively-owned browser session.

// ============================================================================
// Submodules
// ============================================================================

/// Batch request/response endpoint.
pub mod http;

/// Streaming WebSocket endpoint.
pub mod ws;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::dom::DriverFactory;
use crate::error::Result;
use crate::probe::ProbeConfig;

// ============================================================================
// AppState
// ============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Creates one driver session per probe request.
    factory: Arc<dyn DriverFactory>,
    /// Optional override of the explicit-wait bound.
    wait_timeout: Option<Duration>,
    /// Optional override of the inter-cycle pacing delay.
    pace: Option<Duration>,
    /// Optional override of the submit-wait retry count.
    submit_retries: Option<u32>,
}

impl AppState {
    /// Creates state with default probe tuning.
    #[must_use]
    pub fn new(factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            factory,
            wait_timeout: None,
            pace: None,
            submit_retries: None,
        }
    }

    /// Overrides the explicit-wait bound for every session.
    #[inline]
    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Overrides the inter-cycle pacing delay for every session.
    #[inline]
    #[must_use]
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    /// Overrides the submit-wait retry count for every session.
    #[inline]
    #[must_use]
    pub fn with_submit_retries(mut self, retries: u32) -> Self {
        self.submit_retries = Some(retries);
        self
    }

    /// The driver factory.
    #[inline]
    #[must_use]
    pub fn factory(&self) -> &Arc<dyn DriverFactory> {
        &self.factory
    }

    /// Builds a validated session configuration for a requested URL.
    pub fn config_for(&self, url: &str) -> Result<ProbeConfig> {
        let mut config = ProbeConfig::checked(url)?;
        if let Some(timeout) = self.wait_timeout {
            config = config.with_wait_timeout(timeout);
        }
        if let Some(pace) = self.pace {
            config = config.with_pace(pace);
        }
        if let Some(retries) = self.submit_retries {
            config = config.with_submit_retries(retries);
        }
        Ok(config)
    }
}

// ============================================================================
// Router
// ============================================================================

/// Builds the application router.
///
/// CORS stays permissive (the UI is served from a different origin) and every
/// request is traced.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/probe", post(http::probe))
        .route("/ws/probe", get(ws::probe_socket))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dom::fake::FakePage;
    use crate::error::Error;

    fn state() -> AppState {
        AppState::new(Arc::new(FakePage::builder().build().factory()))
    }

    #[test]
    fn test_config_for_rejects_bad_scheme() {
        let err = state().config_for("file:///etc/passwd").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn test_config_for_applies_overrides() {
        let state = state()
            .with_wait_timeout(Duration::from_secs(2))
            .with_pace(Duration::from_millis(5))
            .with_submit_retries(3);

        let config = state.config_for("https://tickets.example/e/1").unwrap();
        assert_eq!(config.wait_timeout, Duration::from_secs(2));
        assert_eq!(config.pace, Duration::from_millis(5));
        assert_eq!(config.submit_retries, 3);
    }

    #[test]
    fn test_router_builds() {
        let _ = router(state());
    }
}
