//! Batch probe endpoint.
//!
//! `POST /probe` accepts `{"url": ...}`, runs a full probe session to natural
//! completion (no cancellation in batch mode) and responds with
//! `{"event_info": {...}, "tickets": {tier: stock}}`. Any unhandled failure
//! surfaces as a human-readable error with a server-error status.

// ============================================================================
// Imports
// ============================================================================

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::Error;
use crate::probe::{ProbeReport, ProbeSession};

use super::AppState;

// ============================================================================
// Request / Response
// ============================================================================

/// Body of a batch probe request.
#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    /// Target event page URL; must carry an explicit `http`/`https` scheme.
    pub url: String,
}

/// Renders the batch response shape.
pub(crate) fn batch_response(report: &ProbeReport) -> Value {
    json!({
        "event_info": report.info,
        "tickets": report.stock_by_tier(),
    })
}

// ============================================================================
// ApiError
// ============================================================================

/// Error wrapper mapping crate errors onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::InvalidUrl { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Runs one batch probe session.
pub async fn probe(
    State(state): State<AppState>,
    Json(request): Json<ProbeRequest>,
) -> Result<Json<Value>, ApiError> {
    info!(url = %request.url, "Batch probe requested");

    let config = state.config_for(&request.url)?;
    let driver = state.factory().create().await?;
    let report = ProbeSession::new(driver, config).run_batch().await?;

    Ok(Json(batch_response(&report)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use crate::dom::fake::{FakePage, FakeTier};
    use crate::probe::EventInfo;

    fn state_for(page: &FakePage) -> AppState {
        AppState::new(Arc::new(page.factory())).with_pace(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_batch_probe_aggregates_all_tiers() {
        let page = FakePage::builder()
            .info(EventInfo {
                title: Some("Concert".to_string()),
                organizer: Some("Venue Co".to_string()),
                ..Default::default()
            })
            .tier(FakeTier::open("35,00 €", "tickets_ticket_list_0_qty", 7).with_max_step(5))
            .tier(FakeTier::sold_out("20,00 €"))
            .build();

        let response = probe(
            State(state_for(&page)),
            Json(ProbeRequest {
                url: "https://tickets.example/e/1".to_string(),
            }),
        )
        .await
        .expect("batch probe succeeds");

        let body = response.0;
        assert_eq!(body["event_info"]["title"], "Concert");
        assert_eq!(body["tickets"]["Tier at 35€"], 7);
        assert_eq!(body["tickets"]["Tier at 20€"], 0);

        // Measurement side effects were compensated and torn down.
        assert_eq!(page.held_reservations(), 0);
        assert!(page.quit_called());
    }

    #[tokio::test]
    async fn test_batch_probe_rejects_bad_url() {
        let page = FakePage::builder().build();
        let result = probe(
            State(state_for(&page)),
            Json(ProbeRequest {
                url: "tickets.example/e/1".to_string(),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError(Error::InvalidUrl { .. }))));
        // No browser session was spent on the rejected request.
        assert!(!page.quit_called());
    }
}
