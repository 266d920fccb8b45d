//! Tier discovery.
//!
//! A [`Tier`] is one purchasable ticket class on the target page. The
//! [`TierCatalog`] enumerates them in document order from a fresh page load;
//! that order defines the probing order for the rest of the session.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::dom::{DomDriver, Locator};
use crate::error::{Error, Result};
use crate::identifiers::ContextId;

use super::config::ProbeConfig;
use super::event::EventInfo;
use super::selectors;

// ============================================================================
// Constants
// ============================================================================

/// First integer run in a price label ("35,00 €" → "35").
static PRICE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("price regex is valid"));

/// Label for a tier whose price cannot be read.
const UNPRICED_LABEL: &str = "Unpriced tier";

// ============================================================================
// Tier
// ============================================================================

/// One purchasable ticket class.
///
/// Created once per discovery pass, mutated only by the prober for its own
/// tier, discarded at session end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    /// Id of the page's quantity-selection control for this tier.
    ///
    /// Absent means the tier was already sold out at discovery time; it is
    /// never probed and its stock stays 0.
    pub control: Option<String>,

    /// Display name, derived from the displayed price.
    pub name: String,

    /// Running total of units successfully reserved during the current
    /// probe. Monotonically non-decreasing within one probe cycle; the final
    /// value is verified available stock, not true remaining inventory.
    pub stock: u32,
}

impl Tier {
    /// Creates a tier with zero verified stock.
    #[inline]
    pub fn new(name: impl Into<String>, control: Option<String>) -> Self {
        Self {
            control,
            name: name.into(),
            stock: 0,
        }
    }

    /// Whether the tier had no quantity control at discovery time.
    #[inline]
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.control.is_none()
    }
}

// ============================================================================
// TierCatalog
// ============================================================================

/// Discovers purchasable tiers and page metadata from the target page.
pub struct TierCatalog<'a> {
    /// Driver owned by the session's worker.
    driver: &'a dyn DomDriver,
    /// Control context; discovery navigates it, so callers must not assume
    /// its page state is preserved afterwards.
    control: &'a ContextId,
    /// Session configuration (canonical URL).
    config: &'a ProbeConfig,
}

impl<'a> TierCatalog<'a> {
    /// Creates a catalog reading through `driver` in the control context.
    #[inline]
    pub fn new(driver: &'a dyn DomDriver, control: &'a ContextId, config: &'a ProbeConfig) -> Self {
        Self {
            driver,
            control,
            config,
        }
    }

    /// Enumerates tiers in document order from a fresh page load.
    ///
    /// For each tier container: the display name comes from the price label
    /// (falling back to a generic label when unreadable), the quantity
    /// control is optional and its absence marks the tier sold out.
    pub async fn discover(&self) -> Result<Vec<Tier>> {
        self.driver
            .navigate(self.control, &self.config.url)
            .await
            .map_err(|e| Error::discovery(format!("loading {}: {e}", self.config.url)))?;

        let containers = self
            .driver
            .find_all(self.control, &Locator::css(selectors::TIER))
            .await
            .map_err(|e| Error::discovery(format!("enumerating tier containers: {e}")))?;

        let mut tiers = Vec::with_capacity(containers.len());
        for container in &containers {
            let name = match self
                .driver
                .find_in(self.control, container, &Locator::css(selectors::TIER_PRICE))
                .await?
            {
                Some(price_el) => {
                    let label = self.driver.text(self.control, &price_el).await?;
                    price_to_name(&label)
                }
                None => UNPRICED_LABEL.to_string(),
            };

            let control = match self
                .driver
                .find_in(
                    self.control,
                    container,
                    &Locator::css(selectors::QUANTITY_SELECT),
                )
                .await?
            {
                Some(select) => self.driver.attribute(self.control, &select, "id").await?,
                None => None,
            };

            debug!(name = %name, control = ?control, "Discovered tier");
            tiers.push(Tier::new(name, control));
        }

        info!(
            count = tiers.len(),
            sold_out = tiers.iter().filter(|t| t.is_sold_out()).count(),
            "Tier discovery finished"
        );
        Ok(tiers)
    }

    /// Reads event-page metadata from the already-loaded page, best-effort.
    ///
    /// Never fails: any piece that cannot be read stays `None`.
    pub async fn event_info(&self) -> EventInfo {
        EventInfo {
            title: self.read_text(selectors::EVENT_TITLE).await,
            date: self.read_text(selectors::EVENT_DATE).await,
            time: self.read_text(selectors::EVENT_TIME).await,
            organizer: self.read_text(selectors::EVENT_ORGANIZER).await,
        }
    }

    /// Reads the trimmed text of the first match, `None` when absent or empty.
    async fn read_text(&self, selector: &str) -> Option<String> {
        let element = self
            .driver
            .find(self.control, &Locator::css(selector))
            .await
            .ok()??;
        let text = self.driver.text(self.control, &element).await.ok()?;
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

// ============================================================================
// Price Parsing
// ============================================================================

/// Derives a tier display name from a displayed price label.
///
/// Keeps the integer part only: "35,00 €" and "35 €" both become
/// "Tier at 35€". Labels with no digits fall back to the unpriced label.
fn price_to_name(label: &str) -> String {
    match PRICE_DIGITS.find(label.trim()) {
        Some(digits) => format!("Tier at {}€", digits.as_str()),
        None => UNPRICED_LABEL.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_to_name_keeps_integer_part() {
        assert_eq!(price_to_name("35,00 €"), "Tier at 35€");
        assert_eq!(price_to_name("  12 €  "), "Tier at 12€");
        assert_eq!(price_to_name("9,50€"), "Tier at 9€");
    }

    #[test]
    fn test_price_to_name_without_digits_falls_back() {
        assert_eq!(price_to_name("free entry"), UNPRICED_LABEL);
        assert_eq!(price_to_name(""), UNPRICED_LABEL);
    }

    #[test]
    fn test_sold_out_tier() {
        let tier = Tier::new("Tier at 20€", None);
        assert!(tier.is_sold_out());
        assert_eq!(tier.stock, 0);

        let open = Tier::new("Tier at 35€", Some("tickets_ticket_list_0_qty".into()));
        assert!(!open.is_sold_out());
    }

    mod discovery {
        use super::*;

        use crate::dom::DomDriver;
        use crate::dom::fake::{FakePage, FakeTier};

        fn config() -> ProbeConfig {
            ProbeConfig::new("https://tickets.example/e/1")
        }

        #[tokio::test]
        async fn test_discover_in_document_order() {
            let page = FakePage::builder()
                .tier(FakeTier::open("35,00 €", "tickets_ticket_list_0_qty", 5))
                .tier(FakeTier::sold_out("20,00 €"))
                .tier(FakeTier::open("12 €", "tickets_ticket_list_2_qty", 3).without_price())
                .build();
            let control = page.initial_context();
            let cfg = config();
            let catalog = TierCatalog::new(&page, &control, &cfg);

            let tiers = catalog.discover().await.expect("discovery succeeds");

            assert_eq!(tiers.len(), 3);
            assert_eq!(tiers[0].name, "Tier at 35€");
            assert_eq!(
                tiers[0].control.as_deref(),
                Some("tickets_ticket_list_0_qty")
            );
            assert_eq!(tiers[1].name, "Tier at 20€");
            assert!(tiers[1].is_sold_out());
            assert_eq!(tiers[2].name, "Unpriced tier");
            assert!(!tiers[2].is_sold_out());
            assert!(tiers.iter().all(|t| t.stock == 0));
        }

        #[tokio::test]
        async fn test_discover_empty_page() {
            let page = FakePage::builder().build();
            let control = page.initial_context();
            let cfg = config();
            let catalog = TierCatalog::new(&page, &control, &cfg);

            let tiers = catalog.discover().await.expect("discovery succeeds");
            assert!(tiers.is_empty());
        }

        #[tokio::test]
        async fn test_event_info_reads_present_fields_only() {
            let page = FakePage::builder()
                .info(EventInfo {
                    title: Some("Concert".to_string()),
                    date: Some("2026-09-01".to_string()),
                    ..Default::default()
                })
                .build();
            let control = page.initial_context();
            let cfg = config();
            let catalog = TierCatalog::new(&page, &control, &cfg);
            catalog.discover().await.expect("discovery succeeds");

            let info = catalog.event_info().await;
            assert_eq!(info.title.as_deref(), Some("Concert"));
            assert_eq!(info.date.as_deref(), Some("2026-09-01"));
            assert_eq!(info.time, None);
            assert_eq!(info.organizer, None);
        }
    }

    mod properties {
        use super::*;

        use proptest::prelude::*;

        proptest! {
            /// Price parsing never panics and always yields one of the two
            /// label shapes.
            #[test]
            fn price_to_name_total(label in ".{0,64}") {
                let name = price_to_name(&label);
                prop_assert!(name == UNPRICED_LABEL || name.starts_with("Tier at "));
            }

            /// Any label with digits keeps its first integer run.
            #[test]
            fn price_to_name_keeps_first_run(n in 0u32..100_000) {
                let name = price_to_name(&format!("{n},00 €"));
                prop_assert_eq!(name, format!("Tier at {n}€"));
            }
        }
    }
}
