//! Compensation: releasing every held reservation.
//!
//! The sweep is the session's mandatory finalizer. It visits every ledgered
//! context, drives the cancel-reservation flow, and closes the context no
//! matter how the rollback went. It never raises: one bad rollback must not
//! block the rest, and it is the only place permitted to leave a reservation
//! held on the target system (released there by the target's own expiry),
//! which is reported as a degraded, not failed, outcome.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dom::{DomDriver, Locator};
use crate::error::Result;
use crate::probe::ledger::ReservationHandle;

use super::selectors;

// ============================================================================
// SweepReport
// ============================================================================

/// Outcome of one compensation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Reservations whose cancel flow completed.
    pub released: usize,
    /// Reservations whose cancel flow failed; their inventory stays held
    /// until the target system expires it.
    pub abandoned: usize,
    /// Contexts closed. Equals the number of handles presented on every
    /// terminal path.
    pub closed: usize,
}

impl SweepReport {
    /// Whether every rollback completed.
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.abandoned == 0
    }
}

// ============================================================================
// CompensationSweep
// ============================================================================

/// Rolls back every ledgered reservation, once per session.
pub struct CompensationSweep<'a> {
    /// Driver owned by the session's worker.
    driver: &'a dyn DomDriver,
    /// Bound for each wait inside the cancel flow.
    timeout: Duration,
}

impl<'a> CompensationSweep<'a> {
    /// Creates a sweep with the session's wait bound.
    #[inline]
    pub fn new(driver: &'a dyn DomDriver, timeout: Duration) -> Self {
        Self { driver, timeout }
    }

    /// Compensates every handle. Never fails.
    ///
    /// Per handle: run the cancel flow; on any failure abandon that rollback
    /// but close the context unconditionally.
    pub async fn compensate(&self, handles: Vec<ReservationHandle>) -> SweepReport {
        let mut report = SweepReport::default();

        for handle in handles {
            match self.rollback(&handle).await {
                Ok(()) => {
                    debug!(context = %handle.context, tier = %handle.tier, "Reservation released");
                    report.released += 1;
                }
                Err(e) => {
                    warn!(
                        context = %handle.context,
                        tier = %handle.tier,
                        error = %e,
                        "Rollback abandoned; reservation stays held until target-side expiry"
                    );
                    report.abandoned += 1;
                }
            }

            // Closure is unconditional, rollback outcome notwithstanding.
            match self.driver.close_context(&handle.context).await {
                Ok(()) => report.closed += 1,
                Err(e) => {
                    warn!(context = %handle.context, error = %e, "Failed to close reservation context");
                }
            }
        }

        if report.is_clean() {
            info!(released = report.released, "Compensation sweep finished");
        } else {
            warn!(
                released = report.released,
                abandoned = report.abandoned,
                "Compensation sweep finished degraded"
            );
        }
        report
    }

    /// Drives the cancel-reservation UI flow inside the handle's context.
    async fn rollback(&self, handle: &ReservationHandle) -> Result<()> {
        let ctx = &handle.context;

        let cancel = self
            .driver
            .wait_until_present(ctx, &Locator::css(selectors::CANCEL), self.timeout)
            .await?;
        self.driver.click(ctx, &cancel).await?;

        self.driver
            .wait_until_visible(ctx, &Locator::css(selectors::CONFIRM_DIALOG), self.timeout)
            .await?;
        let confirm = self
            .driver
            .wait_until_clickable(ctx, &Locator::css(selectors::CONFIRM_ACCEPT), self.timeout)
            .await?;
        self.driver.click(ctx, &confirm).await?;

        self.driver
            .wait_until_invisible(ctx, &Locator::css(selectors::CONFIRM_DIALOG), self.timeout)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dom::DomDriver;
    use crate::dom::fake::{FakePage, FakeTier};
    use crate::probe::selectors;

    const TIMEOUT: Duration = Duration::from_secs(1);

    /// Reserves `qty` units in a fresh context and returns its handle.
    async fn reserve(page: &FakePage, qty: u32) -> ReservationHandle {
        let ctx = page.open_context().await.unwrap();
        page.navigate(&ctx, "https://t.example").await.unwrap();
        let select = page
            .find(&ctx, &Locator::id("tickets_ticket_list_0_qty"))
            .await
            .unwrap()
            .expect("select rendered");
        let option = page
            .find_in(&ctx, &select, &Locator::css(&selectors::option_with_value(qty)))
            .await
            .unwrap()
            .expect("option offered");
        page.click(&ctx, &option).await.unwrap();
        let submit = page
            .wait_until_clickable(&ctx, &Locator::css(selectors::SUBMIT), TIMEOUT)
            .await
            .unwrap();
        page.click(&ctx, &submit).await.unwrap();
        ReservationHandle::new(ctx, "Tier at 35€")
    }

    fn page(remaining: u32) -> FakePage {
        FakePage::builder()
            .tier(FakeTier::open("35,00 €", "tickets_ticket_list_0_qty", remaining))
            .build()
    }

    #[tokio::test]
    async fn test_releases_every_handle_and_closes_every_context() {
        let page = page(10);
        let handles = vec![reserve(&page, 3).await, reserve(&page, 2).await];
        assert_eq!(page.held_reservations(), 2);

        let report = CompensationSweep::new(&page, TIMEOUT)
            .compensate(handles)
            .await;

        assert_eq!(report.released, 2);
        assert_eq!(report.abandoned, 0);
        assert_eq!(report.closed, 2);
        assert!(report.is_clean());
        assert_eq!(page.held_reservations(), 0);
        assert_eq!(page.contexts_closed().len(), 2);
        assert_eq!(page.remaining(0), 10);
    }

    #[tokio::test]
    async fn test_missing_cancel_affordance_degrades_but_still_closes() {
        let page = FakePage::builder()
            .tier(FakeTier::open("35,00 €", "tickets_ticket_list_0_qty", 10))
            .missing_cancel()
            .build();
        let handles = vec![reserve(&page, 4).await, reserve(&page, 1).await];

        let report = CompensationSweep::new(&page, TIMEOUT)
            .compensate(handles)
            .await;

        // Rollbacks were abandoned, yet every context was closed: one bad
        // rollback never blocks the rest and never leaks a context.
        assert_eq!(report.released, 0);
        assert_eq!(report.abandoned, 2);
        assert_eq!(report.closed, 2);
        assert!(!report.is_clean());
        assert_eq!(page.held_reservations(), 2);
    }

    #[tokio::test]
    async fn test_empty_ledger_sweeps_to_nothing() {
        let page = page(5);
        let report = CompensationSweep::new(&page, TIMEOUT)
            .compensate(Vec::new())
            .await;
        assert_eq!(report, SweepReport::default());
    }
}
