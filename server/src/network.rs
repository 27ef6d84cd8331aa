//! HTTP and WebSocket transport in front of the session registry
//!
//! Every connection gets two halves: an outbound pump that copies frames
//! from the participant's bounded queue onto the socket, and an inbound loop
//! that turns text frames into answers for the hub. Join admission happens
//! before the upgrade, so rejected clients get a plain HTTP error.

use crate::error::JoinError;
use crate::registry::{Seat, SessionRegistry};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use shared::{parse_guess, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Query string of `GET /ws`
#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    pub hub: Option<String>,
    pub name: Option<String>,
}

/// Body of a successful `POST /create-hub`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedHub {
    pub hub: String,
}

pub fn router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/create-hub", post(create_hub))
        .route("/ws", get(ws_handler))
        .route("/healthz", get(health))
        .with_state(registry)
}

async fn health() -> &'static str {
    "ok"
}

async fn create_hub(State(registry): State<Arc<SessionRegistry>>) -> Json<CreatedHub> {
    let hub = registry.create_session().await;
    Json(CreatedHub { hub })
}

async fn ws_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Query(params): Query<JoinParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let seat = match admit(&registry, params).await {
        Ok(seat) => seat,
        Err(e) => {
            debug!("Join rejected: {}", e);
            return e.into_response();
        }
    };

    // seat is dropped (and the name released) if the upgrade is refused
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let capacity = registry.config().outbound_capacity;
    ws.on_upgrade(move |socket| handle_socket(socket, seat, capacity))
}

async fn admit(registry: &SessionRegistry, params: JoinParams) -> Result<Seat, JoinError> {
    let hub = params.hub.unwrap_or_default();
    let name = params.name.unwrap_or_default();
    if hub.is_empty() || name.is_empty() {
        return Err(JoinError::MissingName);
    }
    registry.join(&hub, &name).await
}

/// Serves one joined participant until either side goes away
async fn handle_socket(socket: WebSocket, seat: Seat, capacity: usize) {
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    let (reject_tx, reject_rx) = mpsc::unbounded_channel();
    let (sink, stream) = socket.split();

    let mut writer = tokio::spawn(pump_outbound(sink, outbound_rx, reject_rx));
    seat.register(outbound_tx);

    tokio::select! {
        _ = &mut writer => {
            debug!("Outbound queue of {} closed", seat.name());
        },
        _ = read_inbound(stream, &seat, &reject_tx) => {},
    }

    writer.abort();
    info!(
        "{} left hub {} (connection {})",
        seat.name(),
        seat.session_id(),
        seat.connection()
    );
}

/// Copies queued frames onto the socket, closing it once the queue is gone
async fn pump_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Arc<String>>,
    mut rejections: mpsc::UnboundedReceiver<String>,
) {
    loop {
        let text = tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => frame.as_str().to_owned(),
                None => break,
            },
            Some(rejection) = rejections.recv() => rejection,
        };

        if let Err(e) = sink.send(Message::Text(text.into())).await {
            debug!("Socket write failed: {}", e);
            return;
        }
    }

    let _ = sink.close().await;
}

async fn read_inbound(
    mut stream: SplitStream<WebSocket>,
    seat: &Seat,
    rejections: &mpsc::UnboundedSender<String>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match parse_guess(text.as_str()) {
                Ok(value) => seat.submit(value),
                Err(reason) => reject(rejections, reason),
            },
            Ok(Message::Binary(_)) => {
                reject(rejections, "Binary frames are not supported".to_string())
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Socket read failed for {}: {}", seat.name(), e);
                break;
            }
        }
    }
}

fn reject(rejections: &mpsc::UnboundedSender<String>, message: String) {
    match (ServerMessage::Error { message }).to_json() {
        Ok(json) => {
            let _ = rejections.send(json);
        }
        Err(e) => error!("Failed to encode rejection: {}", e),
    }
}
