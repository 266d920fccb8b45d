//! The DOM driver capability surface.
//!
//! The probe engine never talks to a browser directly; it consumes the
//! [`DomDriver`] trait, which any automation backend can implement. Every
//! operation takes the target [`ContextId`] explicitly — there is no ambient
//! "current tab" state, which keeps the engine portable across automation
//! libraries and testable against an in-memory fake.
//!
//! # Capability surface
//!
//! | Group | Operations |
//! |-------|------------|
//! | Navigation | [`navigate`](DomDriver::navigate) |
//! | Lookup | [`find`](DomDriver::find), [`find_all`](DomDriver::find_all), [`find_in`](DomDriver::find_in), [`find_all_in`](DomDriver::find_all_in) |
//! | Reads | [`attribute`](DomDriver::attribute), [`text`](DomDriver::text) |
//! | Interaction | [`click`](DomDriver::click), [`force_click`](DomDriver::force_click) |
//! | Waits | [`wait_until_present`](DomDriver::wait_until_present), [`wait_until_clickable`](DomDriver::wait_until_clickable), [`wait_until_visible`](DomDriver::wait_until_visible), [`wait_until_invisible`](DomDriver::wait_until_invisible) |
//! | Context lifecycle | [`open_context`](DomDriver::open_context), [`close_context`](DomDriver::close_context), [`quit`](DomDriver::quit) |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::{ContextId, ElementId};

use super::locator::Locator;

// ============================================================================
// ElementRef
// ============================================================================

/// A located element, pinned to the context that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    /// Element identity within its context.
    pub id: ElementId,
    /// Context the element was located in.
    pub context: ContextId,
}

impl ElementRef {
    /// Creates an element reference.
    #[inline]
    pub fn new(id: ElementId, context: ContextId) -> Self {
        Self { id, context }
    }
}

// ============================================================================
// DomDriver
// ============================================================================

/// Browser automation capability consumed by the probe engine.
///
/// One instance corresponds to one browser session, exclusively owned by a
/// single probe worker for that session's lifetime — implementations may
/// assume calls are never issued concurrently.
#[async_trait]
pub trait DomDriver: Send + Sync {
    /// Navigates the given context to a URL.
    async fn navigate(&self, ctx: &ContextId, url: &str) -> Result<()>;

    /// Finds the first element matching the locator, if any.
    async fn find(&self, ctx: &ContextId, locator: &Locator) -> Result<Option<ElementRef>>;

    /// Finds all elements matching the locator, in document order.
    async fn find_all(&self, ctx: &ContextId, locator: &Locator) -> Result<Vec<ElementRef>>;

    /// Finds the first descendant of `parent` matching the locator, if any.
    async fn find_in(
        &self,
        ctx: &ContextId,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Option<ElementRef>>;

    /// Finds all descendants of `parent` matching the locator, in document order.
    async fn find_all_in(
        &self,
        ctx: &ContextId,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>>;

    /// Reads an attribute value, `None` when absent.
    async fn attribute(
        &self,
        ctx: &ContextId,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>>;

    /// Reads the element's visible text.
    async fn text(&self, ctx: &ContextId, element: &ElementRef) -> Result<String>;

    /// Clicks the element directly.
    ///
    /// Fails with [`Error::ClickIntercepted`](crate::Error::ClickIntercepted)
    /// when another element (an overlay, a sticky banner) receives the click.
    async fn click(&self, ctx: &ContextId, element: &ElementRef) -> Result<()>;

    /// Clicks the element through a scripted dispatch, bypassing hit-testing.
    ///
    /// Fallback for [`click`](Self::click) interception; equivalent success.
    async fn force_click(&self, ctx: &ContextId, element: &ElementRef) -> Result<()>;

    /// Waits until an element matching the locator is present.
    async fn wait_until_present(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef>;

    /// Waits until an element matching the locator is displayed and enabled.
    async fn wait_until_clickable(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef>;

    /// Waits until an element matching the locator is displayed.
    async fn wait_until_visible(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef>;

    /// Waits until no displayed element matches the locator.
    async fn wait_until_invisible(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<()>;

    /// Opens a fresh browsing context and returns its identity.
    async fn open_context(&self) -> Result<ContextId>;

    /// Closes a browsing context. Closed contexts are never revisited.
    async fn close_context(&self, ctx: &ContextId) -> Result<()>;

    /// Returns the context the session started with.
    ///
    /// The probe uses it as the control context: read-only navigation, never
    /// a reservation.
    fn initial_context(&self) -> ContextId;

    /// Tears down the whole browser session.
    async fn quit(&self) -> Result<()>;
}

// ============================================================================
// DriverFactory
// ============================================================================

/// Creates one fresh driver session per probe session.
///
/// The server layer holds a factory, never a driver: a [`DomDriver`] is
/// single-session, single-owner, and torn down when the session terminates.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Creates a new browser session.
    async fn create(&self) -> Result<Box<dyn DomDriver>>;
}
