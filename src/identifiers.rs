//! Type-safe identifiers for browser-side entities.
//!
//! Newtype wrappers prevent mixing incompatible handles at compile time.
//! Both identifiers wrap the opaque strings the automation end hands out;
//! [`ContextId::random`] mints a local id for in-memory fakes.
//!
//! Context identity is always an explicit value passed to driver operations —
//! the engine never relies on whichever tab the remote end currently focuses.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ContextId
// ============================================================================

/// Identity of one browsing context (tab or window handle).
///
/// Reservation contexts are created fresh per probe cycle and never reused;
/// the control context lives for the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(String);

impl ContextId {
    /// Creates a context id from a handle string.
    #[inline]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Mints a fresh locally-unique context id.
    #[inline]
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the raw handle string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ElementId
// ============================================================================

/// Identity of one located DOM element.
///
/// Valid within the context that produced it, until that context navigates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(String);

impl ElementId {
    /// Creates an element id from a reference string.
    #[inline]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the raw reference string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_id_roundtrip() {
        let ctx = ContextId::new("CDwindow-1234");
        assert_eq!(ctx.as_str(), "CDwindow-1234");
        assert_eq!(ctx.to_string(), "CDwindow-1234");
    }

    #[test]
    fn test_random_context_ids_are_unique() {
        assert_ne!(ContextId::random(), ContextId::random());
    }

    #[test]
    fn test_element_id_display() {
        let el = ElementId::new("e-42");
        assert_eq!(el.to_string(), "e-42");
    }
}
