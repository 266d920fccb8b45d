//! W3C WebDriver backend for [`DomDriver`].
//!
//! Thin JSON-over-HTTP client against a WebDriver remote end (chromedriver,
//! geckodriver, a Selenium grid). One [`WebDriverSession`] wraps one remote
//! session; [`WebDriverFactory`] creates a fresh headless session per probe.
//!
//! # Focus discipline
//!
//! The wire protocol is ambient: element and navigation commands always hit
//! the currently focused window. The engine, by contrast, addresses every
//! operation with an explicit [`ContextId`]. This adapter reconciles the two
//! by tracking the focused handle and switching lazily — focus switching is
//! an internal detail that never leaks to callers.
//!
//! # Waits
//!
//! The remote end offers no push-based readiness, so explicit waits are
//! bounded poll loops (present / displayed / displayed-and-enabled /
//! invisible), sleeping [`POLL_INTERVAL`] between probes.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::{ContextId, ElementId};

use super::driver::{DomDriver, DriverFactory, ElementRef};
use super::locator::Locator;

// ============================================================================
// Constants
// ============================================================================

/// W3C element identifier key in wire payloads.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Delay between condition probes inside a bounded wait.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Displayedness probe, equivalent to what Selenium's `is_displayed` checks.
const DISPLAYED_SCRIPT: &str = "const el = arguments[0]; \
     return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);";

/// Scripted click used as the interception fallback.
const FORCED_CLICK_SCRIPT: &str = "arguments[0].scrollIntoView({block: 'center'}); \
     arguments[0].click();";

// ============================================================================
// WebDriverFactory
// ============================================================================

/// Creates headless browser sessions against a WebDriver remote end.
///
/// # Example
///
/// ```ignore
/// let factory = WebDriverFactory::new("http://localhost:9515");
/// let driver = factory.create().await?;
/// ```
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    /// Remote end base URL, without a trailing slash.
    endpoint: String,
    /// Shared HTTP client.
    http: Client,
    /// Launch browsers without a GUI.
    headless: bool,
}

impl WebDriverFactory {
    /// Creates a factory for the given remote end (e.g. `http://localhost:9515`).
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            headless: true,
        }
    }

    /// Launches visible browser windows instead of headless ones.
    #[inline]
    #[must_use]
    pub fn with_headed(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Builds the new-session capabilities payload.
    fn capabilities(&self) -> Value {
        let mut args = vec!["--no-sandbox", "--disable-gpu", "--disable-dev-shm-usage"];
        if self.headless {
            args.insert(0, "--headless=new");
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn create(&self) -> Result<Box<dyn DomDriver>> {
        let response = self
            .http
            .post(format!("{}/session", self.endpoint))
            .json(&self.capabilities())
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(remote_error(status, &body));
        }

        let session_id = body
            .get("value")
            .and_then(|v| v.get("sessionId"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::session("new session response carried no sessionId"))?
            .to_string();

        info!(session_id = %session_id, "WebDriver session created");

        let session = WebDriverSession::connect(
            self.http.clone(),
            format!("{}/session/{}", self.endpoint, session_id),
            session_id,
        )
        .await?;

        Ok(Box::new(session))
    }
}

// ============================================================================
// WebDriverSession
// ============================================================================

/// One live WebDriver session implementing [`DomDriver`].
pub struct WebDriverSession {
    /// HTTP client shared with the factory.
    http: Client,
    /// Command base: `{endpoint}/session/{id}`.
    base: String,
    /// Remote session id, for logging.
    session_id: String,
    /// Window handle the session started with.
    initial: ContextId,
    /// Currently focused window handle, `None` right after a close.
    focused: Mutex<Option<ContextId>>,
}

impl WebDriverSession {
    /// Finishes session setup by reading the initial window handle.
    async fn connect(http: Client, base: String, session_id: String) -> Result<Self> {
        let session = Self {
            http,
            base,
            session_id,
            initial: ContextId::new(""),
            focused: Mutex::new(None),
        };
        let handle = session
            .execute(Method::GET, "window", None)
            .await?
            .as_str()
            .ok_or_else(|| Error::session("initial window handle missing"))?
            .to_string();

        let initial = ContextId::new(handle);
        *session.focused.lock() = Some(initial.clone());
        Ok(Self { initial, ..session })
    }

    /// Sends one command and returns the `value` field of the response.
    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/{}", self.base, path);
        // W3C POST commands require a body, even an empty one.
        let needs_empty_body = body.is_none() && method == Method::POST;
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        } else if needs_empty_body {
            request = request.json(&json!({}));
        }

        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await?;

        if status.is_success() {
            Ok(payload.get("value").cloned().unwrap_or(Value::Null))
        } else {
            Err(remote_error(status, &payload))
        }
    }

    /// Switches remote focus to `ctx` unless it already holds focus.
    async fn focus(&self, ctx: &ContextId) -> Result<()> {
        if self.focused.lock().as_ref() == Some(ctx) {
            return Ok(());
        }
        self.execute(
            Method::POST,
            "window",
            Some(json!({ "handle": ctx.as_str() })),
        )
        .await
        .map_err(|e| match e {
            Error::WebDriver { ref code, .. } if code == "no such window" => {
                Error::context_not_found(ctx.clone())
            }
            other => other,
        })?;
        *self.focused.lock() = Some(ctx.clone());
        Ok(())
    }

    /// Runs an element-list find against `path`, mapping wire refs.
    async fn find_refs(&self, ctx: &ContextId, path: &str, locator: &Locator) -> Result<Vec<ElementRef>> {
        let value = self
            .execute(
                Method::POST,
                path,
                Some(json!({ "using": "css selector", "value": locator.as_css() })),
            )
            .await?;

        let refs = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get(ELEMENT_KEY))
                    .filter_map(|id| id.as_str())
                    .map(|id| ElementRef::new(ElementId::new(id), ctx.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(refs)
    }

    /// Runs a script with the element as `arguments[0]`.
    async fn execute_script(&self, element: &ElementRef, script: &str) -> Result<Value> {
        self.execute(
            Method::POST,
            "execute/sync",
            Some(json!({
                "script": script,
                "args": [{ ELEMENT_KEY: element.id.as_str() }],
            })),
        )
        .await
    }

    /// Whether the element is currently displayed.
    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let value = self.execute_script(element, DISPLAYED_SCRIPT).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Whether the element is enabled (not `disabled`).
    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .execute(
                Method::GET,
                &format!("element/{}/enabled", element.id),
                None,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Builds the timeout error for an expired wait.
    fn wait_expired(operation: &str, locator: &Locator, timeout: Duration) -> Error {
        Error::timeout(
            format!("{operation}: {}", locator.as_css()),
            timeout.as_millis() as u64,
        )
    }
}

// ============================================================================
// WebDriverSession - DomDriver
// ============================================================================

#[async_trait]
impl DomDriver for WebDriverSession {
    async fn navigate(&self, ctx: &ContextId, url: &str) -> Result<()> {
        debug!(session = %self.session_id, ctx = %ctx, url = %url, "Navigating");
        self.focus(ctx).await?;
        self.execute(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn find(&self, ctx: &ContextId, locator: &Locator) -> Result<Option<ElementRef>> {
        self.focus(ctx).await?;
        let mut refs = self.find_refs(ctx, "elements", locator).await?;
        Ok(if refs.is_empty() {
            None
        } else {
            Some(refs.swap_remove(0))
        })
    }

    async fn find_all(&self, ctx: &ContextId, locator: &Locator) -> Result<Vec<ElementRef>> {
        self.focus(ctx).await?;
        self.find_refs(ctx, "elements", locator).await
    }

    async fn find_in(
        &self,
        ctx: &ContextId,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Option<ElementRef>> {
        self.focus(ctx).await?;
        let mut refs = self
            .find_refs(ctx, &format!("element/{}/elements", parent.id), locator)
            .await?;
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
        self.focus(ctx).await?;
        self.find_refs(ctx, &format!("element/{}/elements", parent.id), locator)
            .await
    }

    async fn attribute(
        &self,
        ctx: &ContextId,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>> {
        self.focus(ctx).await?;
        let value = self
            .execute(
                Method::GET,
                &format!("element/{}/attribute/{name}", element.id),
                None,
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn text(&self, ctx: &ContextId, element: &ElementRef) -> Result<String> {
        self.focus(ctx).await?;
        let value = self
            .execute(Method::GET, &format!("element/{}/text", element.id), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&self, ctx: &ContextId, element: &ElementRef) -> Result<()> {
        debug!(ctx = %ctx, element = %element.id, "Clicking element");
        self.focus(ctx).await?;
        self.execute(Method::POST, &format!("element/{}/click", element.id), None)
            .await?;
        Ok(())
    }

    async fn force_click(&self, ctx: &ContextId, element: &ElementRef) -> Result<()> {
        debug!(ctx = %ctx, element = %element.id, "Force-clicking element");
        self.focus(ctx).await?;
        self.execute_script(element, FORCED_CLICK_SCRIPT).await?;
        Ok(())
    }

    async fn wait_until_present(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(ctx, locator).await? {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(Self::wait_expired("wait for presence", locator, timeout));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_until_clickable(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(ctx, locator).await?
                && self.is_displayed(&element).await?
                && self.is_enabled(&element).await?
            {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(Self::wait_expired("wait for clickable", locator, timeout));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_until_visible(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(ctx, locator).await?
                && self.is_displayed(&element).await?
            {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(Self::wait_expired("wait for visibility", locator, timeout));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_until_invisible(
        &self,
        ctx: &ContextId,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let gone = match self.find(ctx, locator).await? {
                None => true,
                Some(el) => !self.is_displayed(&el).await?,
            };
            if gone {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(
                    format!("wait for invisibility: {}", locator.as_css()),
                    timeout.as_millis() as u64,
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn open_context(&self) -> Result<ContextId> {
        let value = self
            .execute(Method::POST, "window/new", Some(json!({ "type": "tab" })))
            .await?;
        let handle = value
            .get("handle")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::session("window/new response carried no handle"))?;

        let ctx = ContextId::new(handle);
        debug!(session = %self.session_id, ctx = %ctx, "Opened browsing context");
        // Opening a window moves remote focus to it.
        *self.focused.lock() = Some(ctx.clone());
        Ok(ctx)
    }

    async fn close_context(&self, ctx: &ContextId) -> Result<()> {
        debug!(session = %self.session_id, ctx = %ctx, "Closing browsing context");
        self.focus(ctx).await?;
        self.execute(Method::DELETE, "window", None).await?;
        // Focus is undefined after a close until the next explicit switch.
        *self.focused.lock() = None;
        Ok(())
    }

    fn initial_context(&self) -> ContextId {
        self.initial.clone()
    }

    async fn quit(&self) -> Result<()> {
        info!(session = %self.session_id, "Quitting WebDriver session");
        let response = self.http.delete(&self.base).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(remote_error(status, &body));
        }
        Ok(())
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Maps a non-2xx remote response to a crate error.
///
/// `element click intercepted` gets its own variant so the prober can fall
/// back to the forced click.
fn remote_error(status: StatusCode, body: &Value) -> Error {
    let code = body
        .get("value")
        .and_then(|v| v.get("error"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error");
    let message = body
        .get("value")
        .and_then(|v| v.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| status.as_str());

    if code == "element click intercepted" {
        Error::click_intercepted(message)
    } else {
        Error::webdriver(code, message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_headless_args() {
        let factory = WebDriverFactory::new("http://localhost:9515/");
        let caps = factory.capabilities();
        let args = caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .expect("args array");
        assert_eq!(args[0], "--headless=new");
        assert_eq!(factory.endpoint, "http://localhost:9515");
    }

    #[test]
    fn test_capabilities_headed_omits_headless() {
        let factory = WebDriverFactory::new("http://localhost:9515").with_headed();
        let caps = factory.capabilities();
        let args = caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .expect("args array");
        assert!(!args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn test_remote_error_click_intercepted() {
        let body = serde_json::json!({
            "value": {
                "error": "element click intercepted",
                "message": "element <div> obscures it",
            }
        });
        let err = remote_error(StatusCode::BAD_REQUEST, &body);
        assert!(err.is_click_intercepted());
    }

    #[test]
    fn test_remote_error_generic() {
        let body = serde_json::json!({
            "value": { "error": "no such element", "message": "nope" }
        });
        let err = remote_error(StatusCode::NOT_FOUND, &body);
        assert!(matches!(err, Error::WebDriver { ref code, .. } if code == "no such element"));
    }

    #[test]
    fn test_remote_error_unparseable_body() {
        let err = remote_error(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null);
        assert!(matches!(err, Error::WebDriver { ref code, .. } if code == "unknown error"));
    }
}
