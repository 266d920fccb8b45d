//! stockprobe server binary.
//!
//! Boots the HTTP/WebSocket boundary against a WebDriver remote end.
//!
//! # Environment
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HOST` | `0.0.0.0` | Bind address |
//! | `PORT` | `8000` | Bind port |
//! | `WEBDRIVER_URL` | `http://localhost:9515` | WebDriver remote end |
//! | `PROBE_WAIT_TIMEOUT_MS` | `10000` | Explicit-wait bound |
//! | `PROBE_PACE_MS` | `250` | Inter-cycle pacing delay |
//! | `PROBE_SUBMIT_RETRIES` | `0` | Submit-wait retries before exhaustion |
//! | `RUST_LOG` | `stockprobe=info,...` | Log filter |

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use stockprobe::Result;
use stockprobe::dom::WebDriverFactory;
use stockprobe::server::{self, AppState};

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let webdriver = env::var("WEBDRIVER_URL").unwrap_or_else(|_| "http://localhost:9515".to_string());

    let factory = Arc::new(WebDriverFactory::new(webdriver.as_str()));
    let mut state = AppState::new(factory);
    if let Some(timeout) = env_duration_ms("PROBE_WAIT_TIMEOUT_MS") {
        state = state.with_wait_timeout(timeout);
    }
    if let Some(pace) = env_duration_ms("PROBE_PACE_MS") {
        state = state.with_pace(pace);
    }
    if let Some(retries) = env::var("PROBE_SUBMIT_RETRIES")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        state = state.with_submit_retries(retries);
    }

    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!(host = %host, port, webdriver = %webdriver, "stockprobe listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Initializes tracing from `RUST_LOG`, with a sensible default filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stockprobe=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads a millisecond duration from the environment.
fn env_duration_ms(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
