//! Element locator strategies.
//!
//! The probe engine addresses everything on the target page through CSS, so
//! only two strategies exist: a raw CSS selector and an id shorthand.
//!
//! # Example
//!
//! ```ignore
//! use stockprobe::dom::Locator;
//!
//! let submit = Locator::css("button[type=submit].btn-dark:not([disabled])");
//! let control = Locator::id("tickets_ticket_list_0_qty");
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Locator Enum
// ============================================================================

/// Element lookup strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value")]
pub enum Locator {
    /// CSS selector.
    #[serde(rename = "css")]
    Css(String),

    /// Element id (shorthand for the `#id` CSS selector).
    #[serde(rename = "id")]
    Id(String),
}

impl Locator {
    /// Creates a CSS selector locator.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates an id locator.
    #[inline]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Returns the strategy name.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::Id(_) => "id",
        }
    }

    /// Returns the raw selector value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v) | Self::Id(v) => v,
        }
    }

    /// Renders the locator as a CSS selector string.
    ///
    /// This is the wire-level form: the WebDriver backend only speaks
    /// `css selector`, so id locators are rendered as `#id`.
    #[must_use]
    pub fn as_css(&self) -> String {
        match self {
            Self::Css(v) => v.clone(),
            Self::Id(v) => format!("#{v}"),
        }
    }
}

impl From<&str> for Locator {
    /// Converts a string to a CSS locator (default strategy).
    fn from(s: &str) -> Self {
        Self::Css(s.to_string())
    }
}

impl From<String> for Locator {
    /// Converts a string to a CSS locator (default strategy).
    fn from(s: String) -> Self {
        Self::Css(s)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_locator() {
        let loc = Locator::css("div.ticket");
        assert_eq!(loc.strategy(), "css");
        assert_eq!(loc.value(), "div.ticket");
        assert_eq!(loc.as_css(), "div.ticket");
    }

    #[test]
    fn test_id_locator_renders_as_css() {
        let loc = Locator::id("tickets_ticket_list_3_qty");
        assert_eq!(loc.strategy(), "id");
        assert_eq!(loc.as_css(), "#tickets_ticket_list_3_qty");
    }

    #[test]
    fn test_from_str() {
        let loc: Locator = "select option".into();
        assert!(matches!(loc, Locator::Css(_)));
    }
}
