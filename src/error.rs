//! Error types for the stock probing engine.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use stockprobe::{Result, Error};
//!
//! async fn example(driver: &dyn DomDriver, ctx: &ContextId) -> Result<()> {
//!     let submit = driver.wait_until_clickable(ctx, &SUBMIT, timeout).await?;
//!     driver.click(ctx, &submit).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Driver session | [`Error::Session`], [`Error::WebDriver`], [`Error::ContextNotFound`] |
//! | Element | [`Error::ElementNotFound`], [`Error::ClickIntercepted`] |
//! | Probing | [`Error::Discovery`], [`Error::Timeout`] |
//! | Bridging | [`Error::StreamClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::ContextId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when probe or server configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Target URL rejected before a session was started.
    ///
    /// The probe only accepts URLs with an explicit `http`/`https` scheme.
    #[error("Invalid target URL {url:?}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Driver Session Errors
    // ========================================================================
    /// Driver session could not be created or was lost.
    #[error("Driver session error: {message}")]
    Session {
        /// Description of the session failure.
        message: String,
    },

    /// Error response from the remote automation end.
    ///
    /// `code` carries the protocol error string (e.g. `"no such element"`).
    #[error("WebDriver error [{code}]: {message}")]
    WebDriver {
        /// Protocol-level error code.
        code: String,
        /// Human-readable message from the remote end.
        message: String,
    },

    /// Browsing context does not exist or is already closed.
    #[error("Context not found: {context}")]
    ContextNotFound {
        /// The missing context.
        context: ContextId,
    },

    // ========================================================================
    // Element Errors
    // ========================================================================
    /// Element not found by selector.
    #[error("Element not found: selector={selector}, context={context}")]
    ElementNotFound {
        /// Selector used for the lookup.
        selector: String,
        /// Context where the lookup ran.
        context: ContextId,
    },

    /// A direct click was intercepted by another element.
    ///
    /// Recovered locally via the forced-click fallback; callers outside the
    /// prober never observe this variant.
    #[error("Click intercepted: {message}")]
    ClickIntercepted {
        /// Message from the remote end describing the obstruction.
        message: String,
    },

    // ========================================================================
    // Probing Errors
    // ========================================================================
    /// Tier discovery failed.
    ///
    /// Unlike per-tier probe failures, a discovery failure aborts the session.
    #[error("Discovery failed: {message}")]
    Discovery {
        /// Description of the discovery failure.
        message: String,
    },

    /// Bounded wait expired.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Bridging Errors
    // ========================================================================
    /// Event consumer disconnected.
    #[error("Event stream closed by consumer")]
    StreamClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error talking to the automation end.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a driver session error.
    #[inline]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Creates a WebDriver protocol error.
    #[inline]
    pub fn webdriver(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WebDriver {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a context not found error.
    #[inline]
    pub fn context_not_found(context: ContextId) -> Self {
        Self::ContextNotFound { context }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(selector: impl Into<String>, context: ContextId) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
            context,
        }
    }

    /// Creates a click intercepted error.
    #[inline]
    pub fn click_intercepted(message: impl Into<String>) -> Self {
        Self::ClickIntercepted {
            message: message.into(),
        }
    }

    /// Creates a discovery error.
    #[inline]
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if a direct click was intercepted.
    #[inline]
    #[must_use]
    pub fn is_click_intercepted(&self) -> bool {
        matches!(self, Self::ClickIntercepted { .. })
    }

    /// Returns `true` if this error means "nothing further to probe".
    ///
    /// A lookup timeout or missing affordance ends the current tier's loop;
    /// it is an expected terminal condition, never surfaced to callers.
    #[inline]
    #[must_use]
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ElementNotFound { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::discovery("no tier containers on page");
        assert_eq!(
            err.to_string(),
            "Discovery failed: no tier containers on page"
        );
    }

    #[test]
    fn test_invalid_url_display() {
        let err = Error::invalid_url("ftp://x", "scheme must be http or https");
        assert_eq!(
            err.to_string(),
            "Invalid target URL \"ftp://x\": scheme must be http or https"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::timeout("wait for quantity control", 10_000);
        let other_err = Error::config("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_click_intercepted() {
        let intercepted = Error::click_intercepted("overlay in the way");
        let other = Error::session("gone");

        assert!(intercepted.is_click_intercepted());
        assert!(!other.is_click_intercepted());
    }

    #[test]
    fn test_is_exhaustion() {
        let timeout_err = Error::timeout("wait", 5_000);
        let missing = Error::element_not_found("#qty", ContextId::new("ctx-1"));
        let fatal = Error::session("driver crashed");

        assert!(timeout_err.is_exhaustion());
        assert!(missing.is_exhaustion());
        assert!(!fatal.is_exhaustion());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
