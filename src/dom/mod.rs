//! Browser capability layer.
//!
//! The probe engine consumes the [`DomDriver`] trait; backends adapt it to a
//! concrete automation stack.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `driver` | [`DomDriver`] / [`DriverFactory`] capability traits |
//! | `locator` | [`Locator`] lookup strategies |
//! | `webdriver` | W3C WebDriver HTTP backend |
//! | `fake` | Scriptable in-memory page (tests / `testkit` feature) |

// ============================================================================
// Submodules
// ============================================================================

mod driver;
mod locator;

/// W3C WebDriver HTTP backend.
pub mod webdriver;

/// Scriptable in-memory fake of the target page.
#[cfg(any(test, feature = "testkit"))]
pub mod fake;

// ============================================================================
// Re-exports
// ============================================================================

pub use driver::{DomDriver, DriverFactory, ElementRef};
pub use locator::Locator;
pub use webdriver::{WebDriverFactory, WebDriverSession};
