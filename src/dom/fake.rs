//! Scriptable in-memory fake of a ticketing page.
//!
//! Implements [`DomDriver`] against a mutable model of the target page: tiers
//! with depleting stock, per-context selection state, a cancel-confirmation
//! modal, and explicit context bookkeeping. Waits evaluate instantly, so
//! tests never sleep.
//!
//! Scriptable failure modes cover the engine's recovery paths: submit-click
//! interception, a submit affordance that never becomes clickable, a missing
//! cancel affordance, navigation loss mid-probe.
//!
//! Everything observable by tests (contexts opened/closed, reservations
//! made/cancelled, remaining units) is exposed through accessor methods.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::identifiers::{ContextId, ElementId};
use crate::probe::event::EventInfo;
use crate::probe::selectors;

use super::driver::{DomDriver, DriverFactory, ElementRef};
use super::locator::Locator;

// ============================================================================
// Fixtures
// ============================================================================

/// One tier fixture on the fake page.
#[derive(Debug, Clone)]
pub struct FakeTier {
    /// Displayed price label; `None` renders no price element.
    price: Option<String>,
    /// Quantity control id; `None` renders no select (sold out).
    control: Option<String>,
    /// Units actually available.
    remaining: u32,
    /// Largest option the page offers per cycle.
    max_step: u32,
    /// Render the select with no positive options at all.
    no_options: bool,
}

impl FakeTier {
    /// A purchasable tier with a quantity control.
    #[must_use]
    pub fn open(price: &str, control: &str, remaining: u32) -> Self {
        Self {
            price: Some(price.to_string()),
            control: Some(control.to_string()),
            remaining,
            max_step: 10,
            no_options: false,
        }
    }

    /// A tier already sold out at discovery time (no quantity control).
    #[must_use]
    pub fn sold_out(price: &str) -> Self {
        Self {
            price: Some(price.to_string()),
            control: None,
            remaining: 0,
            max_step: 10,
            no_options: false,
        }
    }

    /// Caps the largest option offered per cycle.
    #[must_use]
    pub fn with_max_step(mut self, max_step: u32) -> Self {
        self.max_step = max_step;
        self
    }

    /// Removes the price element.
    #[must_use]
    pub fn without_price(mut self) -> Self {
        self.price = None;
        self
    }

    /// Renders the select with only the non-numeric placeholder option.
    #[must_use]
    pub fn with_no_options(mut self) -> Self {
        self.no_options = true;
        self
    }

    /// Largest option currently offered, 0 when none.
    fn offered(&self) -> u32 {
        if self.no_options {
            0
        } else {
            self.remaining.min(self.max_step)
        }
    }

    /// Whether the page currently renders this tier's select.
    fn select_rendered(&self) -> bool {
        self.control.is_some() && (self.remaining > 0 || self.no_options)
    }
}

/// One reservation made against the fake page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeReservation {
    /// Context that holds the reservation.
    pub context: ContextId,
    /// Tier index the reservation belongs to.
    pub tier: usize,
    /// Units reserved.
    pub qty: u32,
    /// Whether the cancel flow completed for it.
    pub cancelled: bool,
}

// ============================================================================
// Page State
// ============================================================================

/// Per-context view state.
#[derive(Debug, Default)]
struct ContextState {
    open: bool,
    loaded: bool,
    selected: Option<(usize, u32)>,
    reservation: Option<usize>,
    modal_open: bool,
}

/// Shared mutable model of the fake page.
struct PageState {
    info: EventInfo,
    tiers: Vec<FakeTier>,
    contexts: FxHashMap<ContextId, ContextState>,
    initial: ContextId,
    opened: usize,
    closed: Vec<ContextId>,
    reservations: Vec<FakeReservation>,
    intercept_submits: u32,
    submit_stuck: bool,
    cancel_missing: bool,
    fail_open_context: bool,
    fail_navigation_after: Option<usize>,
    quit: bool,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for a [`FakePage`].
#[derive(Debug, Default)]
pub struct FakePageBuilder {
    info: EventInfo,
    tiers: Vec<FakeTier>,
    intercept_submits: u32,
    submit_stuck: bool,
    cancel_missing: bool,
    fail_open_context: bool,
    fail_navigation_after: Option<usize>,
}

impl FakePageBuilder {
    /// Sets the event-page metadata.
    #[must_use]
    pub fn info(mut self, info: EventInfo) -> Self {
        self.info = info;
        self
    }

    /// Appends a tier fixture (document order).
    #[must_use]
    pub fn tier(mut self, tier: FakeTier) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Intercepts the next `count` direct submit clicks.
    #[must_use]
    pub fn intercept_submits(mut self, count: u32) -> Self {
        self.intercept_submits = count;
        self
    }

    /// The submit affordance never becomes clickable.
    #[must_use]
    pub fn submit_stuck(mut self) -> Self {
        self.submit_stuck = true;
        self
    }

    /// Post-reservation pages render no cancel affordance.
    #[must_use]
    pub fn missing_cancel(mut self) -> Self {
        self.cancel_missing = true;
        self
    }

    /// Opening a browsing context fails.
    #[must_use]
    pub fn fail_open_context(mut self) -> Self {
        self.fail_open_context = true;
        self
    }

    /// Navigation fails once this many reservations exist.
    #[must_use]
    pub fn fail_navigation_after(mut self, reservations: usize) -> Self {
        self.fail_navigation_after = Some(reservations);
        self
    }

    /// Builds the page with its initial (control) context open.
    #[must_use]
    pub fn build(self) -> FakePage {
        let initial = ContextId::random();
        let mut contexts = FxHashMap::default();
        contexts.insert(
            initial.clone(),
            ContextState {
                open: true,
                ..Default::default()
            },
        );
        FakePage {
            state: Arc::new(Mutex::new(PageState {
                info: self.info,
                tiers: self.tiers,
                contexts,
                initial,
                opened: 0,
                closed: Vec::new(),
                reservations: Vec::new(),
                intercept_submits: self.intercept_submits,
                submit_stuck: self.submit_stuck,
                cancel_missing: self.cancel_missing,
                fail_open_context: self.fail_open_context,
                fail_navigation_after: self.fail_navigation_after,
                quit: false,
            })),
        }
    }
}

// ============================================================================
// FakePage
// ============================================================================

/// Scriptable fake ticketing page; clones share state.
#[derive(Clone)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    /// Starts building a fake page.
    #[must_use]
    pub fn builder() -> FakePageBuilder {
        FakePageBuilder::default()
    }

    /// A factory producing clones of this page, for boundary-layer tests.
    #[must_use]
    pub fn factory(&self) -> FakeFactory {
        FakeFactory { page: self.clone() }
    }

    // ------------------------------------------------------------------
    // Observations
    // ------------------------------------------------------------------

    /// Number of contexts opened through [`DomDriver::open_context`].
    #[must_use]
    pub fn contexts_opened(&self) -> usize {
        self.state.lock().opened
    }

    /// Contexts closed so far, in closing order.
    #[must_use]
    pub fn contexts_closed(&self) -> Vec<ContextId> {
        self.state.lock().closed.clone()
    }

    /// Number of contexts currently open (control context included).
    #[must_use]
    pub fn contexts_open(&self) -> usize {
        self.state.lock().contexts.values().filter(|c| c.open).count()
    }

    /// Every reservation made, in reservation order.
    #[must_use]
    pub fn reservations(&self) -> Vec<FakeReservation> {
        self.state.lock().reservations.clone()
    }

    /// Reservations still held (cancel flow not completed).
    #[must_use]
    pub fn held_reservations(&self) -> usize {
        self.state
            .lock()
            .reservations
            .iter()
            .filter(|r| !r.cancelled)
            .count()
    }

    /// Units remaining for the tier at `index`.
    #[must_use]
    pub fn remaining(&self, index: usize) -> u32 {
        self.state.lock().tiers[index].remaining
    }

    /// Whether the session was quit.
    #[must_use]
    pub fn quit_called(&self) -> bool {
        self.state.lock().quit
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolves a top-level selector in `ctx` to element ids.
    fn resolve(&self, state: &PageState, ctx: &ContextState, selector: &str) -> Vec<String> {
        if selector == selectors::TIER {
            return (0..state.tiers.len()).map(|i| format!("tier-{i}")).collect();
        }
        if let Some(id) = selector.strip_prefix('#') {
            return state
                .tiers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.select_rendered() && t.control.as_deref() == Some(id))
                .map(|(i, _)| format!("select-{i}"))
                .collect();
        }
        if selector == selectors::SUBMIT {
            return if ctx.loaded {
                vec!["submit".to_string()]
            } else {
                Vec::new()
            };
        }
        if selector == selectors::CANCEL {
            return if ctx.reservation.is_some() && !state.cancel_missing {
                vec!["cancel".to_string()]
            } else {
                Vec::new()
            };
        }
        if selector == selectors::CONFIRM_DIALOG {
            return if ctx.modal_open {
                vec!["modal".to_string()]
            } else {
                Vec::new()
            };
        }
        if selector == selectors::CONFIRM_ACCEPT {
            return if ctx.modal_open {
                vec!["confirm".to_string()]
            } else {
                Vec::new()
            };
        }
        let info = &state.info;
        let field = match selector {
            s if s == selectors::EVENT_TITLE => info.title.as_ref().map(|_| "info-title"),
            s if s == selectors::EVENT_DATE => info.date.as_ref().map(|_| "info-date"),
            s if s == selectors::EVENT_TIME => info.time.as_ref().map(|_| "info-time"),
            s if s == selectors::EVENT_ORGANIZER => {
                info.organizer.as_ref().map(|_| "info-organizer")
            }
            _ => None,
        };
        field.map(|f| vec![f.to_string()]).unwrap_or_default()
    }

    /// Resolves a child selector under `parent`.
    fn resolve_in(&self, state: &PageState, parent: &str, selector: &str) -> Vec<String> {
        if let Some(index) = parse_indexed(parent, "tier-") {
            let tier = &state.tiers[index];
            if selector == selectors::TIER_PRICE {
                return tier
                    .price
                    .as_ref()
                    .map(|_| vec![format!("price-{index}")])
                    .unwrap_or_default();
            }
            if selector == selectors::QUANTITY_SELECT {
                return if tier.select_rendered() {
                    vec![format!("select-{index}")]
                } else {
                    Vec::new()
                };
            }
        }
        if let Some(index) = parse_indexed(parent, "select-") {
            let tier = &state.tiers[index];
            if selector == selectors::OPTION {
                let mut options = vec![format!("option-{index}-ph")];
                options.extend((1..=tier.offered()).map(|v| format!("option-{index}-{v}")));
                return options;
            }
            if let Some(qty) = parse_option_selector(selector) {
                return if qty >= 1 && qty <= tier.offered() {
                    vec![format!("option-{index}-{qty}")]
                } else {
                    Vec::new()
                };
            }
        }
        Vec::new()
    }

    /// Looks up the context or fails like a closed window would.
    fn with_context<T>(
        &self,
        ctx: &ContextId,
        f: impl FnOnce(&mut PageState, &ContextId) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        match state.contexts.get(ctx) {
            Some(c) if c.open => f(&mut state, ctx),
            _ => Err(Error::context_not_found(ctx.clone())),
        }
    }

    /// Instant find used by every lookup entry point.
    fn find_ids(&self, ctx: &ContextId, locator: &Locator) -> Result<Vec<String>> {
        self.with_context(ctx, |state, ctx_id| {
            let ctx_state = &state.contexts[ctx_id];
            Ok(self.resolve(state, ctx_state, &locator.as_css()))
        })
    }

    /// Whether the submit affordance is clickable in `ctx`.
    fn submit_clickable(state: &PageState, ctx: &ContextState) -> bool {
        !state.submit_stuck && ctx.selected.is_some()
    }
}

// ============================================================================
// FakePage - DomDriver
// ============================================================================

#[async_trait]
impl DomDriver for FakePage {
    async fn navigate(&self, ctx: &ContextId, _url: &str) -> Result<()> {
        self.with_context(ctx, |state, ctx_id| {
            if let Some(limit) = state.fail_navigation_after
                && state.reservations.len() >= limit
            {
                return Err(Error::session("fake navigation failure"));
            }
            let ctx_state = state.contexts.get_mut(ctx_id).expect("checked open");
            // A fresh load resets view state; the reservation itself is
            // server-side and survives.
            ctx_state.loaded = true;
            ctx_state.selected = None;
            ctx_state.modal_open = false;
            Ok(())
        })
    }

    async fn find(&self, ctx: &ContextId, locator: &Locator) -> Result<Option<ElementRef>> {
        let ids = self.find_ids(ctx, locator)?;
        Ok(ids
            .into_iter()
            .next()
            .map(|id| ElementRef::new(ElementId::new(id), ctx.clone())))
    }

    async fn find_all(&self, ctx: &ContextId, locator: &Locator) -> Result<Vec<ElementRef>> {
        let ids = self.find_ids(ctx, locator)?;
        Ok(ids
            .into_iter()
            .map(|id| ElementRef::new(ElementId::new(id), ctx.clone()))
            .collect())
    }

    async fn find_in(
        &self,
        ctx: &ContextId,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Option<ElementRef>> {
        let mut refs = self.find_all_in(ctx, parent, locator).await?;
        Ok(if refs.is_empty() {
            None
        } else {
            Some(refs.swap_remove(0))
        })
    }

    async fn find_all_in(
        &self,
        ctx: &ContextId,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>> {
        self.with_context(ctx, |state, ctx_id| {
            let ids = self.resolve_in(state, parent.id.as_str(), &locator.as_css());
            Ok(ids
                .into_iter()
                .map(|id| ElementRef::new(ElementId::new(id), ctx_id.clone()))
                .collect())
        })
    }

    async fn attribute(
        &self,
        ctx: &ContextId,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>> {
        self.with_context(ctx, |state, _| {
            let id = element.id.as_str();
            Ok(match name {
                "id" => parse_indexed(id, "select-")
                    .and_then(|i| state.tiers[i].control.clone()),
                "value" => {
                    if id.ends_with("-ph") {
                        Some(String::new())
                    } else {
                        id.rsplit('-').next().map(str::to_string)
                    }
                }
                _ => None,
            })
        })
    }

    async fn text(&self, ctx: &ContextId, element: &ElementRef) -> Result<String> {
        self.with_context(ctx, |state, _| {
            let id = element.id.as_str();
            if let Some(index) = parse_indexed(id, "price-") {
                return Ok(state.tiers[index].price.clone().unwrap_or_default());
            }
            let info = &state.info;
            Ok(match id {
                "info-title" => info.title.clone(),
                "info-date" => info.date.clone(),
                "info-time" => info.time.clone(),
                "info-organizer" => info.organizer.clone(),
                _ => None,
            }
            .unwrap_or_default())
        })
    }

    async fn click(&self, ctx: &ContextId, element: &ElementRef) -> Result<()> {
        self.interact(ctx, element, false)
    }

    async fn force_click(&self, ctx: &ContextId, element: &ElementRef) -> Result<()> {
        self.interact(ctx, element, true)
    }

    async fn wait_until_present(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef> {
        self.find(ctx, locator).await?.ok_or_else(|| {
            Error::timeout(
                format!("wait for presence: {}", locator.as_css()),
                timeout.as_millis() as u64,
            )
        })
    }

    async fn wait_until_clickable(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef> {
        let element = self.wait_until_present(ctx, locator, timeout).await?;
        if element.id.as_str() == "submit" {
            let clickable = self.with_context(ctx, |state, ctx_id| {
                Ok(Self::submit_clickable(state, &state.contexts[ctx_id]))
            })?;
            if !clickable {
                return Err(Error::timeout(
                    format!("wait for clickable: {}", locator.as_css()),
                    timeout.as_millis() as u64,
                ));
            }
        }
        Ok(element)
    }

    async fn wait_until_visible(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef> {
        self.wait_until_present(ctx, locator, timeout).await
    }

    async fn wait_until_invisible(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<()> {
        match self.find(ctx, locator).await? {
            None => Ok(()),
            Some(_) => Err(Error::timeout(
                format!("wait for invisibility: {}", locator.as_css()),
                timeout.as_millis() as u64,
            )),
        }
    }

    async fn open_context(&self) -> Result<ContextId> {
        let mut state = self.state.lock();
        if state.fail_open_context {
            return Err(Error::session("fake context-open failure"));
        }
        let ctx = ContextId::random();
        state.contexts.insert(
            ctx.clone(),
            ContextState {
                open: true,
                ..Default::default()
            },
        );
        state.opened += 1;
        Ok(ctx)
    }

    async fn close_context(&self, ctx: &ContextId) -> Result<()> {
        let mut state = self.state.lock();
        match state.contexts.get_mut(ctx) {
            Some(c) if c.open => {
                c.open = false;
                state.closed.push(ctx.clone());
                Ok(())
            }
            _ => Err(Error::context_not_found(ctx.clone())),
        }
    }

    fn initial_context(&self) -> ContextId {
        self.state.lock().initial.clone()
    }

    async fn quit(&self) -> Result<()> {
        self.state.lock().quit = true;
        Ok(())
    }
}

impl FakePage {
    /// Shared click path; `forced` bypasses interception.
    fn interact(&self, ctx: &ContextId, element: &ElementRef, forced: bool) -> Result<()> {
        self.with_context(ctx, |state, ctx_id| {
            let id = element.id.as_str().to_string();

            if let Some(rest) = id.strip_prefix("option-")
                && !rest.ends_with("ph")
            {
                let mut parts = rest.splitn(2, '-');
                let tier: usize = parts.next().unwrap_or_default().parse().unwrap_or(0);
                let qty: u32 = parts.next().unwrap_or_default().parse().unwrap_or(0);
                state.contexts.get_mut(ctx_id).expect("checked open").selected =
                    Some((tier, qty));
                return Ok(());
            }

            match id.as_str() {
                "submit" => {
                    if !forced && state.intercept_submits > 0 {
                        state.intercept_submits -= 1;
                        return Err(Error::click_intercepted("overlay intercepts the submit"));
                    }
                    let Some((tier, qty)) =
                        state.contexts[ctx_id].selected
                    else {
                        return Err(Error::webdriver(
                            "invalid element state",
                            "no quantity selected",
                        ));
                    };
                    let reserved = qty.min(state.tiers[tier].remaining);
                    state.tiers[tier].remaining -= reserved;
                    let index = state.reservations.len();
                    state.reservations.push(FakeReservation {
                        context: ctx_id.clone(),
                        tier,
                        qty: reserved,
                        cancelled: false,
                    });
                    state.contexts.get_mut(ctx_id).expect("checked open").reservation =
                        Some(index);
                    Ok(())
                }
                "cancel" => {
                    state.contexts.get_mut(ctx_id).expect("checked open").modal_open = true;
                    Ok(())
                }
                "confirm" => {
                    let ctx_state = state.contexts.get_mut(ctx_id).expect("checked open");
                    ctx_state.modal_open = false;
                    let Some(index) = ctx_state.reservation else {
                        return Err(Error::webdriver(
                            "invalid element state",
                            "nothing to cancel",
                        ));
                    };
                    let (tier, qty) = {
                        let r = &mut state.reservations[index];
                        r.cancelled = true;
                        (r.tier, r.qty)
                    };
                    // Released units return to the pool.
                    state.tiers[tier].remaining += qty;
                    Ok(())
                }
                _ => Ok(()),
            }
        })
    }
}

// ============================================================================
// FakeFactory
// ============================================================================

/// Factory handing out clones of one shared [`FakePage`].
#[derive(Clone)]
pub struct FakeFactory {
    page: FakePage,
}

#[async_trait]
impl DriverFactory for FakeFactory {
    async fn create(&self) -> Result<Box<dyn DomDriver>> {
        Ok(Box::new(self.page.clone()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses `"{prefix}{index}"` element ids.
fn parse_indexed(id: &str, prefix: &str) -> Option<usize> {
    id.strip_prefix(prefix)?.split('-').next()?.parse().ok()
}

/// Parses `option[value='N']` selectors.
fn parse_option_selector(selector: &str) -> Option<u32> {
    selector
        .strip_prefix("option[value='")?
        .strip_suffix("']")?
        .parse()
        .ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_one_tier(remaining: u32) -> FakePage {
        FakePage::builder()
            .tier(FakeTier::open("35,00 €", "tickets_ticket_list_0_qty", remaining).with_max_step(5))
            .build()
    }

    #[tokio::test]
    async fn test_discovery_surface() {
        let page = page_with_one_tier(12);
        let ctx = page.initial_context();
        page.navigate(&ctx, "https://t.example").await.unwrap();

        let tiers = page.find_all(&ctx, &Locator::css(selectors::TIER)).await.unwrap();
        assert_eq!(tiers.len(), 1);

        let select = page
            .find_in(&ctx, &tiers[0], &Locator::css(selectors::QUANTITY_SELECT))
            .await
            .unwrap()
            .expect("select rendered");
        let id = page.attribute(&ctx, &select, "id").await.unwrap();
        assert_eq!(id.as_deref(), Some("tickets_ticket_list_0_qty"));
    }

    #[tokio::test]
    async fn test_options_follow_remaining_stock() {
        let page = page_with_one_tier(3);
        let ctx = page.initial_context();
        page.navigate(&ctx, "https://t.example").await.unwrap();

        let select = page
            .find(&ctx, &Locator::id("tickets_ticket_list_0_qty"))
            .await
            .unwrap()
            .expect("select rendered");
        let options = page
            .find_all_in(&ctx, &select, &Locator::css(selectors::OPTION))
            .await
            .unwrap();
        // Placeholder plus 1..=3.
        assert_eq!(options.len(), 4);
        let first = page.attribute(&ctx, &options[0], "value").await.unwrap();
        assert_eq!(first.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_reservation_depletes_stock() {
        let page = page_with_one_tier(5);
        let ctx = page.open_context().await.unwrap();
        page.navigate(&ctx, "https://t.example").await.unwrap();

        let select = page
            .find(&ctx, &Locator::id("tickets_ticket_list_0_qty"))
            .await
            .unwrap()
            .expect("select rendered");
        let option = page
            .find_in(&ctx, &select, &Locator::css(&selectors::option_with_value(5)))
            .await
            .unwrap()
            .expect("option offered");
        page.click(&ctx, &option).await.unwrap();
        let submit = page
            .wait_until_clickable(&ctx, &Locator::css(selectors::SUBMIT), Duration::from_secs(1))
            .await
            .unwrap();
        page.click(&ctx, &submit).await.unwrap();

        assert_eq!(page.remaining(0), 0);
        assert_eq!(page.held_reservations(), 1);
        // Exhausted tier no longer renders its select.
        assert!(
            page.find(&ctx, &Locator::id("tickets_ticket_list_0_qty"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_cancel_flow_returns_units() {
        let page = page_with_one_tier(5);
        let ctx = page.open_context().await.unwrap();
        page.navigate(&ctx, "https://t.example").await.unwrap();
        let select = page
            .find(&ctx, &Locator::id("tickets_ticket_list_0_qty"))
            .await
            .unwrap()
            .unwrap();
        let option = page
            .find_in(&ctx, &select, &Locator::css(&selectors::option_with_value(2)))
            .await
            .unwrap()
            .unwrap();
        page.click(&ctx, &option).await.unwrap();
        let submit = page
            .wait_until_clickable(&ctx, &Locator::css(selectors::SUBMIT), Duration::from_secs(1))
            .await
            .unwrap();
        page.click(&ctx, &submit).await.unwrap();
        assert_eq!(page.remaining(0), 3);

        let cancel = page
            .find(&ctx, &Locator::css(selectors::CANCEL))
            .await
            .unwrap()
            .expect("cancel affordance rendered");
        page.click(&ctx, &cancel).await.unwrap();
        let confirm = page
            .find(&ctx, &Locator::css(selectors::CONFIRM_ACCEPT))
            .await
            .unwrap()
            .expect("modal open");
        page.click(&ctx, &confirm).await.unwrap();

        assert_eq!(page.held_reservations(), 0);
        assert_eq!(page.remaining(0), 5);
        page.wait_until_invisible(
            &ctx,
            &Locator::css(selectors::CONFIRM_DIALOG),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_closed_context_rejects_operations() {
        let page = page_with_one_tier(1);
        let ctx = page.open_context().await.unwrap();
        page.close_context(&ctx).await.unwrap();

        let err = page.navigate(&ctx, "https://t.example").await.unwrap_err();
        assert!(matches!(err, Error::ContextNotFound { .. }));
        assert!(page.close_context(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_intercepted_submit_then_forced() {
        let page = FakePage::builder()
            .tier(FakeTier::open("10 €", "tickets_ticket_list_0_qty", 2))
            .intercept_submits(1)
            .build();
        let ctx = page.open_context().await.unwrap();
        page.navigate(&ctx, "https://t.example").await.unwrap();
        let select = page
            .find(&ctx, &Locator::id("tickets_ticket_list_0_qty"))
            .await
            .unwrap()
            .unwrap();
        let option = page
            .find_in(&ctx, &select, &Locator::css(&selectors::option_with_value(2)))
            .await
            .unwrap()
            .unwrap();
        page.click(&ctx, &option).await.unwrap();
        let submit = page
            .wait_until_clickable(&ctx, &Locator::css(selectors::SUBMIT), Duration::from_secs(1))
            .await
            .unwrap();

        let err = page.click(&ctx, &submit).await.unwrap_err();
        assert!(err.is_click_intercepted());

        page.force_click(&ctx, &submit).await.unwrap();
        assert_eq!(page.held_reservations(), 1);
    }
}
