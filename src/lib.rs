//! stockprobe - Ticket inventory probing through reserve-and-release automation.
//!
//! The target ticketing page exposes no stock API: the only way to learn how
//! many tickets remain is to reserve them through the purchase UI, observe
//! how many reservations succeed, and release every reservation made. This
//! crate is that measurement engine, plus the HTTP/WebSocket boundary that
//! exposes it.
//!
//! # Architecture
//!
//! ```text
//!  POST /probe ─────┐
//!                   ├─► ProbeSession ──► TierCatalog (discover, once)
//!  GET /ws/probe ───┘        │
//!        ▲                   ├─► StockProber (per tier, sequentially)
//!        │ events            │        └─► ReservationLedger
//!   StreamBridge ◄───────────┤
//!                            └─► CompensationSweep (always, once)
//! ```
//!
//! Key design principles:
//!
//! - Every probe is a side effect: a held reservation, recorded in the
//!   ledger, released by the sweep on every terminal path.
//! - The driver is a capability ([`DomDriver`]) with explicit context
//!   identity — no ambient "current tab" state, any automation backend fits.
//! - Cancellation is cooperative: a [`probe::StopSignal`] checked at cycle
//!   boundaries, never preempting an in-flight wait or click.
//! - One worker task owns the driver per session; events reach the consumer
//!   through a FIFO channel.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stockprobe::dom::{DriverFactory, WebDriverFactory};
//! use stockprobe::probe::{ProbeConfig, ProbeSession};
//!
//! # async fn example() -> stockprobe::Result<()> {
//! let factory = WebDriverFactory::new("http://localhost:9515");
//! let driver = factory.create().await?;
//!
//! let config = ProbeConfig::checked("https://tickets.example/event/42")?;
//! let report = ProbeSession::new(driver, config).run_batch().await?;
//!
//! for tier in &report.tiers {
//!     println!("{}: {} verified", tier.name, tier.stock);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`probe`] | Discovery, probing, ledger, compensation, orchestration |
//! | [`dom`] | Driver capability traits and backends |
//! | [`bridge`] | Worker-to-consumer event bridging |
//! | [`server`] | axum HTTP/WebSocket boundary |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe id wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Worker-to-consumer event bridging.
pub mod bridge;

/// Browser capability layer: [`DomDriver`], backends.
pub mod dom;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers for browser-side entities.
pub mod identifiers;

/// The probing-and-compensation engine.
pub mod probe;

/// HTTP/WebSocket boundary.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use probe::{
    EventInfo, ProbeConfig, ProbeEvent, ProbeReport, ProbeSession, StopSignal, SweepReport, Tier,
};

// Capability types
pub use dom::{DomDriver, DriverFactory, ElementRef, Locator, WebDriverFactory};

// Bridging types
pub use bridge::{ProbeStream, StreamBridge};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ContextId, ElementId};
