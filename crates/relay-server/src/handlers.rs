//! Connection handlers for the Relay server.
//!
//! This module handles the connection lifecycle: each WebSocket gets a hub
//! identity, a writer half that drains the client's outbound queue, and a
//! reader half that feeds inbound frames to the dispatcher.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use relay_core::{dispatch, ClientId, Dispatch, Hub, HubConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Shared server state.
pub struct AppState {
    /// The pub/sub hub.
    pub hub: Hub,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let hub_config = HubConfig {
            outbound_capacity: config.limits.outbound_queue,
        };

        Self {
            hub: Hub::with_config(hub_config),
            config,
        }
    }
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            warn!("Failed to start metrics server: {}", e);
        }
    }

    // Build router
    let app = Router::new()
        .route(&config.transport.websocket_path, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    // Bind and serve
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Relay server listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.transport.websocket_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();

    // Register with the hub: fresh identity plus the outbound queue this
    // task drains onto the socket.
    let (client_id, mut outbound) = state.hub.connect();
    debug!(client = %client_id, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            biased;

            // Drain payloads queued for this client.
            queued = outbound.recv() => {
                match queued {
                    Some(payload) => {
                        metrics::record_frame(payload.len(), "outbound");
                        let message = match std::str::from_utf8(&payload) {
                            Ok(text) => Message::Text(text.to_string()),
                            Err(_) => Message::Binary(payload.to_vec()),
                        };
                        if sender.send(message).await.is_err() {
                            break;
                        }
                    }
                    // The hub evicted this client (terminal send failure).
                    None => break,
                }
            }

            // Receive from WebSocket
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&state, &client_id, text.as_bytes());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        handle_frame(&state, &client_id, &data);
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // axum answers pings itself
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pongs
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(client = %client_id, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(client = %client_id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(client = %client_id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup: the hub drops the client and every subscription it held.
    state.hub.disconnect(&client_id);
    metrics::set_active_topics(state.hub.stats().topic_count);

    debug!(client = %client_id, "WebSocket disconnected");
}

/// Feed one inbound frame to the dispatcher.
fn handle_frame(state: &Arc<AppState>, client_id: &ClientId, frame: &[u8]) {
    if frame.len() > state.config.limits.max_message_size {
        warn!(
            client = %client_id,
            size = frame.len(),
            "Dropping oversized frame"
        );
        metrics::record_error("oversized");
        return;
    }

    metrics::record_frame(frame.len(), "inbound");

    match dispatch(&state.hub, client_id, frame) {
        Dispatch::Subscribed { topic } => {
            metrics::record_subscription();
            metrics::set_active_topics(state.hub.stats().topic_count);
            debug!(client = %client_id, topic = %topic, "Subscribed");
        }
        Dispatch::Published { topic, recipients } => {
            metrics::record_deliveries(recipients);
            debug!(client = %client_id, topic = %topic, recipients, "Published");
        }
        Dispatch::Ignored => {}
        Dispatch::Malformed => {
            metrics::record_dropped_frame();
        }
    }
}
