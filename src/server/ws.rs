//! Streaming probe endpoint.
//!
//! `GET /ws/probe` upgrades, expects exactly one inbound `{"url": ...}`
//! message, then emits in order: one `{"event_info": {...}}`, zero or more
//! `{"tier": name, "stock": total}`, and exactly one terminal message —
//! `{"__complete__": true}` or `{"__error__": message}` — before the server
//! closes the channel.
//!
//! Abrupt closure by the remote side is a cancellation request, not a fault:
//! it sets the session's stop signal and the worker still compensates every
//! ledgered reservation before tearing down.

// ============================================================================
// Imports
// ============================================================================

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::bridge::StreamBridge;
use crate::probe::ProbeSession;

use super::AppState;

// ============================================================================
// Request Parsing
// ============================================================================

/// First inbound message on the channel.
#[derive(Debug, Deserialize)]
struct ProbeTarget {
    /// Target event page URL.
    url: String,
}

/// Extracts the target URL from the first inbound text frame.
fn parse_target(text: &str) -> Option<String> {
    serde_json::from_str::<ProbeTarget>(text)
        .ok()
        .map(|t| t.url)
}

// ============================================================================
// Handler
// ============================================================================

/// Upgrades the connection and runs the streaming protocol.
pub async fn probe_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle(socket, state))
}

/// Drives one streaming session over an upgraded socket.
async fn handle(socket: WebSocket, state: AppState) {
    let (mut sink, mut inbound) = socket.split();

    // One request message starts the session.
    let url = match read_target(&mut inbound).await {
        Target::Url(url) => url,
        Target::Malformed => {
            let _ = send_json(
                &mut sink,
                json!({ "__error__": "expected a {\"url\": ...} message" }),
            )
            .await;
            let _ = sink.close().await;
            return;
        }
        Target::Gone => {
            debug!("Channel closed before a probe target arrived");
            return;
        }
    };

    let config = match state.config_for(&url) {
        Ok(config) => config,
        Err(e) => {
            let _ = send_json(&mut sink, json!({ "__error__": e.to_string() })).await;
            let _ = sink.close().await;
            return;
        }
    };

    let driver = match state.factory().create().await {
        Ok(driver) => driver,
        Err(e) => {
            warn!(error = %e, "Driver session creation failed");
            let _ = send_json(&mut sink, json!({ "__error__": e.to_string() })).await;
            let _ = sink.close().await;
            return;
        }
    };

    info!(url = %url, "Streaming probe started");
    let mut stream = StreamBridge::spawn(ProbeSession::new(driver, config));
    let stop = stream.stop_signal();

    loop {
        tokio::select! {
            event = stream.recv() => {
                let Some(event) = event else { break };
                let terminal = event.is_terminal();
                if send_json(&mut sink, event.to_json()).await.is_err() {
                    debug!("Consumer went away mid-delivery; cancelling");
                    stop.set();
                    break;
                }
                if terminal {
                    break;
                }
            }
            incoming = inbound.next() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                        debug!("Remote closed the channel; cancelling");
                        stop.set();
                        break;
                    }
                    // Further inbound messages have no meaning mid-session.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = sink.close().await;
}

// ============================================================================
// Channel Helpers
// ============================================================================

/// How the opening exchange ended.
enum Target {
    /// A parseable `{"url": ...}` message arrived.
    Url(String),
    /// A text frame arrived but did not carry a target.
    Malformed,
    /// The channel closed or failed first.
    Gone,
}

/// Reads frames until a text frame with a target URL, a close, or an error.
async fn read_target(inbound: &mut SplitStream<WebSocket>) -> Target {
    loop {
        match inbound.next().await {
            Some(Ok(Message::Text(text))) => {
                return parse_target(&text).map_or(Target::Malformed, Target::Url);
            }
            None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return Target::Gone,
            Some(Ok(_)) => {}
        }
    }
}

/// Sends one JSON value as a text frame.
async fn send_json(
    sink: &mut SplitSink<WebSocket, Message>,
    value: Value,
) -> Result<(), axum::Error> {
    sink.send(Message::Text(value.to_string().into())).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target(r#"{"url": "https://tickets.example/e/1"}"#).as_deref(),
            Some("https://tickets.example/e/1")
        );
    }

    #[test]
    fn test_parse_target_rejects_garbage() {
        assert_eq!(parse_target("not json"), None);
        assert_eq!(parse_target(r#"{"link": "https://x"}"#), None);
    }
}
