//! The reserve-and-measure loop for one tier.
//!
//! Every read of remaining stock is also a write: a real reservation that the
//! compensation sweep must later release. Each cycle reads the tier's
//! quantity options in the control context, reserves the maximum available
//! quantity in a fresh reservation context, records the held reservation in
//! the ledger, and emits the new running total.
//!
//! Picking the maximum option minimizes reservation round-trips at the cost
//! of coarser incremental granularity; the final total is exact either way.

// ============================================================================
// Imports
// ============================================================================

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::dom::{DomDriver, ElementRef, Locator};
use crate::error::{Error, Result};
use crate::identifiers::ContextId;

use super::config::ProbeConfig;
use super::event::{EventSender, ProbeEvent};
use super::ledger::{ReservationHandle, ReservationLedger};
use super::selectors;
use super::signal::StopSignal;
use super::tier::Tier;

// ============================================================================
// StockProber
// ============================================================================

/// Runs the probe loop for single tiers of one session.
pub struct StockProber<'a> {
    /// Driver owned by the session's worker.
    driver: &'a dyn DomDriver,
    /// Session configuration.
    config: &'a ProbeConfig,
    /// Control context: read-only navigation, never holds a reservation.
    control: ContextId,
}

impl<'a> StockProber<'a> {
    /// Creates a prober reading through `control`.
    #[inline]
    pub fn new(driver: &'a dyn DomDriver, config: &'a ProbeConfig, control: ContextId) -> Self {
        Self {
            driver,
            config,
            control,
        }
    }

    /// Probes one tier to exhaustion, cancellation, or failure.
    ///
    /// Emits a [`ProbeEvent::TierUpdate`] per successful reservation. A tier
    /// sold out at discovery emits exactly one zero update and costs no
    /// driver calls. Expected terminal conditions (control gone, no positive
    /// options, submit unavailable) return `Ok`; only unrecoverable driver
    /// failures propagate.
    pub async fn probe(
        &self,
        tier: &mut Tier,
        ledger: &ReservationLedger,
        stop: &StopSignal,
        events: &EventSender,
    ) -> Result<()> {
        let Some(control_id) = tier.control.clone() else {
            debug!(tier = %tier.name, "Tier sold out at discovery; skipping probe");
            events.send(ProbeEvent::TierUpdate {
                tier: tier.name.clone(),
                stock: 0,
            });
            return Ok(());
        };
        let control_locator = Locator::id(control_id);

        loop {
            if stop.is_set() {
                debug!(tier = %tier.name, stock = tier.stock, "Stop observed at cycle boundary");
                return Ok(());
            }

            match self.cycle(tier, &control_locator, ledger).await? {
                Some(qty) => {
                    tier.stock += qty;
                    debug!(tier = %tier.name, qty, stock = tier.stock, "Reservation succeeded");
                    events.send(ProbeEvent::TierUpdate {
                        tier: tier.name.clone(),
                        stock: tier.stock,
                    });
                    sleep(self.config.pace).await;
                }
                None => {
                    debug!(tier = %tier.name, stock = tier.stock, "Tier exhausted");
                    return Ok(());
                }
            }
        }
    }

    /// Runs one probe cycle.
    ///
    /// Returns the reserved quantity, or `None` when the tier is exhausted.
    /// The reservation context is recorded in the ledger on success and
    /// closed immediately on failure — a context that holds no reservation
    /// must not reach the sweep.
    async fn cycle(
        &self,
        tier: &Tier,
        control_locator: &Locator,
        ledger: &ReservationLedger,
    ) -> Result<Option<u32>> {
        // Read state in the control context from a fresh load.
        self.driver
            .navigate(&self.control, &self.config.url)
            .await?;
        let select = match self
            .driver
            .wait_until_present(&self.control, control_locator, self.config.wait_timeout)
            .await
        {
            Ok(select) => select,
            Err(e) if e.is_exhaustion() => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(qty) = self.max_option(&select).await? else {
            return Ok(None);
        };

        // Reserve in a fresh, never-reused context.
        let ctx = self.driver.open_context().await?;
        match self.reserve(&ctx, control_locator, qty).await {
            Ok(()) => {
                ledger.record(ReservationHandle::new(ctx, tier.name.clone()));
                Ok(Some(qty))
            }
            Err(e) if e.is_exhaustion() => {
                self.discard_context(&ctx).await;
                Ok(None)
            }
            Err(e) => {
                self.discard_context(&ctx).await;
                Err(e)
            }
        }
    }

    /// Largest positive numeric option of the quantity control, if any.
    async fn max_option(&self, select: &ElementRef) -> Result<Option<u32>> {
        let options = self
            .driver
            .find_all_in(&self.control, select, &Locator::css(selectors::OPTION))
            .await?;

        let mut best = None;
        for option in &options {
            let Some(value) = self.driver.attribute(&self.control, option, "value").await? else {
                continue;
            };
            if let Ok(qty) = value.trim().parse::<u32>()
                && qty > 0
            {
                best = Some(best.map_or(qty, |b: u32| b.max(qty)));
            }
        }
        Ok(best)
    }

    /// Executes the reservation flow for `qty` units inside `ctx`.
    async fn reserve(&self, ctx: &ContextId, control_locator: &Locator, qty: u32) -> Result<()> {
        self.driver.navigate(ctx, &self.config.url).await?;

        // State is per-context: re-locate the control in this one.
        let select = self
            .driver
            .wait_until_present(ctx, control_locator, self.config.wait_timeout)
            .await?;
        let option_locator = Locator::css(selectors::option_with_value(qty));
        let option = self
            .driver
            .find_in(ctx, &select, &option_locator)
            .await?
            .ok_or_else(|| Error::element_not_found(option_locator.as_css(), ctx.clone()))?;
        self.checked_click(ctx, &option).await?;

        let submit = self.await_submit(ctx).await?;
        self.checked_click(ctx, &submit).await?;
        Ok(())
    }

    /// Waits for the submit affordance, retrying per configuration.
    ///
    /// A timeout after the configured retries is authoritative tier
    /// exhaustion, not a transient to paper over.
    async fn await_submit(&self, ctx: &ContextId) -> Result<ElementRef> {
        let locator = Locator::css(selectors::SUBMIT);
        let mut attempt = 0;
        loop {
            match self
                .driver
                .wait_until_clickable(ctx, &locator, self.config.wait_timeout)
                .await
            {
                Ok(submit) => return Ok(submit),
                Err(e) if e.is_timeout() && attempt < self.config.submit_retries => {
                    attempt += 1;
                    debug!(attempt, "Submit not clickable yet; retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Direct click with the forced-interaction fallback.
    ///
    /// Both paths count as equivalent success; only the interception error is
    /// recovered here.
    async fn checked_click(&self, ctx: &ContextId, element: &ElementRef) -> Result<()> {
        match self.driver.click(ctx, element).await {
            Err(e) if e.is_click_intercepted() => {
                debug!(ctx = %ctx, "Direct click intercepted; forcing");
                self.driver.force_click(ctx, element).await
            }
            other => other,
        }
    }

    /// Closes a context that holds no reservation.
    async fn discard_context(&self, ctx: &ContextId) {
        if let Err(e) = self.driver.close_context(ctx).await {
            warn!(ctx = %ctx, error = %e, "Failed to close discarded context");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use crate::dom::fake::{FakePage, FakeTier};

    const CONTROL: &str = "tickets_ticket_list_0_qty";

    fn config() -> ProbeConfig {
        ProbeConfig::new("https://tickets.example/e/1").with_pace(Duration::from_millis(1))
    }

    struct Harness {
        page: FakePage,
        ledger: ReservationLedger,
        stop: StopSignal,
        rx: UnboundedReceiver<ProbeEvent>,
        events: EventSender,
    }

    fn harness(page: FakePage) -> Harness {
        let stop = StopSignal::new();
        let (tx, rx) = mpsc::unbounded_channel();
        Harness {
            page,
            ledger: ReservationLedger::new(),
            stop: stop.clone(),
            rx,
            events: EventSender::new(tx, stop),
        }
    }

    async fn probe_tier(h: &mut Harness, tier: &mut Tier) {
        let cfg = config();
        let prober = StockProber::new(&h.page, &cfg, h.page.initial_context());
        prober
            .probe(tier, &h.ledger, &h.stop, &h.events)
            .await
            .expect("probe terminates cleanly");
    }

    fn updates(rx: &mut UnboundedReceiver<ProbeEvent>) -> Vec<u32> {
        let mut totals = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ProbeEvent::TierUpdate { stock, .. } = event {
                totals.push(stock);
            }
        }
        totals
    }

    #[tokio::test]
    async fn test_sold_out_tier_is_zero_cost() {
        let mut h = harness(FakePage::builder().build());
        let mut tier = Tier::new("Tier at 20€", None);

        probe_tier(&mut h, &mut tier).await;

        assert_eq!(updates(&mut h.rx), [0]);
        assert_eq!(tier.stock, 0);
        assert!(h.ledger.is_empty());
        assert_eq!(h.page.contexts_opened(), 0);
    }

    #[tokio::test]
    async fn test_probes_until_exhaustion_picking_max_option() {
        let page = FakePage::builder()
            .tier(FakeTier::open("35,00 €", CONTROL, 8).with_max_step(5))
            .build();
        let mut h = harness(page);
        let mut tier = Tier::new("Tier at 35€", Some(CONTROL.to_string()));

        probe_tier(&mut h, &mut tier).await;

        // 5 then 3: always the largest offered option.
        assert_eq!(updates(&mut h.rx), [5, 8]);
        assert_eq!(tier.stock, 8);
        assert_eq!(h.ledger.len(), 2);
        assert_eq!(h.page.remaining(0), 0);
    }

    #[tokio::test]
    async fn test_stop_set_before_probe_attempts_nothing() {
        let page = FakePage::builder()
            .tier(FakeTier::open("35,00 €", CONTROL, 8))
            .build();
        let mut h = harness(page);
        h.stop.set();
        let mut tier = Tier::new("Tier at 35€", Some(CONTROL.to_string()));

        probe_tier(&mut h, &mut tier).await;

        assert!(updates(&mut h.rx).is_empty());
        assert_eq!(tier.stock, 0);
        assert_eq!(h.page.contexts_opened(), 0);
    }

    #[tokio::test]
    async fn test_stop_mid_probe_halts_at_cycle_boundary() {
        let page = FakePage::builder()
            .tier(FakeTier::open("35,00 €", CONTROL, 50).with_max_step(2))
            .build();
        let stop = StopSignal::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventSender::new(tx, stop.clone());
        let ledger = ReservationLedger::new();
        let mut tier = Tier::new("Tier at 35€", Some(CONTROL.to_string()));

        let cfg = config();
        let mut last_seen = 0;
        {
            let prober = StockProber::new(&page, &cfg, page.initial_context());
            let probing = prober.probe(&mut tier, &ledger, &stop, &events);
            tokio::pin!(probing);

            // Observe the first update, then cancel.
            loop {
                tokio::select! {
                    result = &mut probing => {
                        result.expect("probe terminates cleanly");
                        break;
                    }
                    Some(event) = rx.recv(), if last_seen == 0 => {
                        if let ProbeEvent::TierUpdate { stock, .. } = event {
                            last_seen = stock;
                            stop.set();
                        }
                    }
                }
            }
        }

        // Nothing was reserved after the signal was observed at the next
        // boundary; at most the in-flight cycle completed.
        assert!(tier.stock <= last_seen + 2);
        assert_eq!(ledger.len(), h_len(tier.stock));
        assert!(page.remaining(0) >= 50 - tier.stock);
    }

    /// Reservations happen 2 units at a time in the test above.
    fn h_len(stock: u32) -> usize {
        stock.div_ceil(2) as usize
    }

    #[tokio::test]
    async fn test_intercepted_submit_falls_back_to_forced_click() {
        let page = FakePage::builder()
            .tier(FakeTier::open("35,00 €", CONTROL, 2).with_max_step(2))
            .intercept_submits(1)
            .build();
        let mut h = harness(page);
        let mut tier = Tier::new("Tier at 35€", Some(CONTROL.to_string()));

        probe_tier(&mut h, &mut tier).await;

        // The interception was invisible: the reservation still landed.
        assert_eq!(updates(&mut h.rx), [2]);
        assert_eq!(h.ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_select_without_positive_options_means_exhausted() {
        let page = FakePage::builder()
            .tier(FakeTier::open("35,00 €", CONTROL, 4).with_no_options())
            .build();
        let mut h = harness(page);
        let mut tier = Tier::new("Tier at 35€", Some(CONTROL.to_string()));

        probe_tier(&mut h, &mut tier).await;

        assert!(updates(&mut h.rx).is_empty());
        assert_eq!(tier.stock, 0);
        assert!(h.ledger.is_empty());
        assert_eq!(h.page.contexts_opened(), 0);
    }

    #[tokio::test]
    async fn test_failed_reservation_context_is_discarded_not_ledgered() {
        let page = FakePage::builder()
            .tier(FakeTier::open("35,00 €", CONTROL, 4))
            .submit_stuck()
            .build();
        let mut h = harness(page);
        let mut tier = Tier::new("Tier at 35€", Some(CONTROL.to_string()));

        probe_tier(&mut h, &mut tier).await;

        assert_eq!(tier.stock, 0);
        assert!(h.ledger.is_empty());
        assert_eq!(h.page.contexts_opened(), 1);
        assert_eq!(h.page.contexts_closed().len(), 1);
    }
}
