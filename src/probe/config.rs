//! Probe session configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use stockprobe::probe::ProbeConfig;
//!
//! let config = ProbeConfig::checked("https://tickets.example/event/42")?
//!     .with_wait_timeout(Duration::from_secs(5))
//!     .with_submit_retries(2);
//! ```

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default bound for every explicit wait (matches the page's slowest render).
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between probe cycles; paces requests to the target server.
const DEFAULT_PACE: Duration = Duration::from_millis(250);

// ============================================================================
// ProbeConfig
// ============================================================================

/// Configuration for one probe session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Canonical URL of the target event page.
    pub url: String,

    /// Bound applied to every explicit wait.
    pub wait_timeout: Duration,

    /// Delay between probe cycles.
    pub pace: Duration,

    /// Extra attempts for the submit-affordance wait before a tier is
    /// declared exhausted. `0` treats the first failed wait as authoritative.
    pub submit_retries: u32,
}

// ============================================================================
// Constructors
// ============================================================================

impl ProbeConfig {
    /// Creates a configuration with default tuning for the given URL.
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            pace: DEFAULT_PACE,
            submit_retries: 0,
        }
    }

    /// Creates a configuration after validating the target URL.
    ///
    /// The probe only accepts absolute URLs with an explicit `http`/`https`
    /// scheme; anything else is rejected before a browser session is spent.
    pub fn checked(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let parsed = Url::parse(&url).map_err(|e| Error::invalid_url(&url, e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self::new(url)),
            other => Err(Error::invalid_url(
                &url,
                format!("scheme must be http or https, got {other:?}"),
            )),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ProbeConfig {
    /// Sets the explicit-wait bound.
    #[inline]
    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sets the inter-cycle pacing delay.
    #[inline]
    #[must_use]
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Sets the number of submit-wait retries before declaring exhaustion.
    #[inline]
    #[must_use]
    pub fn with_submit_retries(mut self, retries: u32) -> Self {
        self.submit_retries = retries;
        self
    }

    /// Wait timeout in milliseconds, for log fields and error messages.
    #[inline]
    #[must_use]
    pub fn wait_timeout_ms(&self) -> u64 {
        self.wait_timeout.as_millis() as u64
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::new("https://tickets.example/e/1");
        assert_eq!(config.wait_timeout, Duration::from_secs(10));
        assert_eq!(config.pace, Duration::from_millis(250));
        assert_eq!(config.submit_retries, 0);
    }

    #[test]
    fn test_checked_accepts_http_and_https() {
        assert!(ProbeConfig::checked("http://tickets.example/e/1").is_ok());
        assert!(ProbeConfig::checked("https://tickets.example/e/1").is_ok());
    }

    #[test]
    fn test_checked_rejects_other_schemes() {
        let err = ProbeConfig::checked("ftp://tickets.example/e/1").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn test_checked_rejects_relative_urls() {
        let err = ProbeConfig::checked("tickets.example/e/1").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn test_builder_methods() {
        let config = ProbeConfig::new("https://t.example")
            .with_wait_timeout(Duration::from_secs(3))
            .with_pace(Duration::from_millis(10))
            .with_submit_retries(2);

        assert_eq!(config.wait_timeout_ms(), 3_000);
        assert_eq!(config.pace, Duration::from_millis(10));
        assert_eq!(config.submit_retries, 2);
    }
}
