//! CSS anchors on the target ticketing page.
//!
//! Everything the engine touches on the page is located through these
//! selectors; the in-memory fake driver interprets the same constants, so a
//! page redesign is a one-file change.

/// One purchasable tier container.
pub const TIER: &str = "div.ticket";

/// Displayed price inside a tier container.
pub const TIER_PRICE: &str = ".ticket-price span";

/// Quantity `<select>` inside a tier container.
pub const QUANTITY_SELECT: &str = "select[id^='tickets_ticket_list'][id$='_qty']";

/// Options of a quantity control.
pub const OPTION: &str = "option";

/// Reservation submit button, enabled variants only.
pub const SUBMIT: &str = "button[type=submit].btn-dark:not([disabled])";

/// Cancel-reservation affordance on a post-reservation page.
pub const CANCEL: &str = "button.cancel-reservation";

/// Cancellation confirmation dialog.
pub const CONFIRM_DIALOG: &str = "div.modal-confirm";

/// Accept button inside the confirmation dialog.
pub const CONFIRM_ACCEPT: &str = "div.modal-confirm button.btn-confirm";

/// Event page header fields.
pub const EVENT_TITLE: &str = "h1.event-title";
pub const EVENT_DATE: &str = ".event-date";
pub const EVENT_TIME: &str = ".event-time";
pub const EVENT_ORGANIZER: &str = ".event-organizer";

/// Selector for the option carrying a specific quantity value.
#[must_use]
pub fn option_with_value(qty: u32) -> String {
    format!("option[value='{qty}']")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_with_value() {
        assert_eq!(option_with_value(5), "option[value='5']");
    }
}
