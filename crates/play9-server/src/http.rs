//! HTTP/WS surface (spec.md §4.F): join/leave/state endpoints and the
//! websocket upgrade. Everything here is a thin translation layer over
//! `SessionHandle` — no game logic lives in this module.

use crate::error::ApiError;
use crate::message::ServerMessage;
use crate::registry::Registry;
use crate::validation::{is_valid_player_name, is_valid_table_name};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use log::debug;
use play9_core::{Intent, PlayerId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/play9", get(lobby_page))
        .route("/play9/table/:name", get(table_page))
        .route("/play9/player/:name", get(player_page))
        .route("/play9/join", post(join))
        .route("/play9/leave", post(leave))
        .route("/play9/api/table/:name", get(table_snapshot))
        .route("/play9/ws/:name", get(ws_upgrade))
        .with_state(registry)
}

/// The HTML/CSS/JS client is out of scope (spec.md §1): these three
/// routes exist so the URLs in §4.F resolve to something, not to render
/// a real UI.
async fn lobby_page() -> Html<&'static str> {
    Html("<!doctype html><title>play9</title><p>play9 lobby.</p>")
}

async fn table_page(Path(_name): Path<String>) -> Html<&'static str> {
    Html("<!doctype html><title>play9</title><p>play9 table.</p>")
}

async fn player_page(Path(_name): Path<String>) -> Html<&'static str> {
    Html("<!doctype html><title>play9</title><p>play9 player.</p>")
}

#[derive(Deserialize)]
struct JoinRequest {
    table_name: String,
    player_name: Option<String>,
}

#[derive(Serialize)]
struct JoinResponse {
    table_name: String,
    player_id: Option<PlayerId>,
}

async fn join(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    if !is_valid_table_name(&req.table_name) {
        return Err(ApiError::InvalidName);
    }
    let Some(player_name) = req.player_name else {
        // A join with no player name is a spectator-only join: it only
        // needs the table to exist (or be created), no seat is taken.
        registry.get_or_create(&req.table_name);
        return Ok(Json(JoinResponse {
            table_name: req.table_name,
            player_id: None,
        }));
    };
    if !is_valid_player_name(&player_name) {
        return Err(ApiError::InvalidName);
    }

    let handle = registry.get_or_create(&req.table_name);
    let player_id = handle.join(player_name).await?;

    Ok(Json(JoinResponse {
        table_name: req.table_name,
        player_id: Some(player_id),
    }))
}

#[derive(Deserialize)]
struct LeaveRequest {
    table_name: String,
    player_id: PlayerId,
}

/// Idempotent (spec.md §4.F): leaving a table twice, or an unknown table,
/// is not an error.
async fn leave(
    State(registry): State<Arc<Registry>>,
    Json(req): Json<LeaveRequest>,
) -> impl IntoResponse {
    if let Ok(handle) = registry.get(&req.table_name) {
        handle.leave(req.player_id).await;
    }
    axum::http::StatusCode::NO_CONTENT
}

async fn table_snapshot(
    State(registry): State<Arc<Registry>>,
    Path(name): Path<String>,
) -> Result<Json<ServerMessage>, ApiError> {
    let handle = registry.get(&name)?;
    let msg = handle.snapshot().await?;
    Ok(Json(msg))
}

#[derive(Deserialize)]
struct WsQuery {
    id: Option<PlayerId>,
}

async fn ws_upgrade(
    State(registry): State<Arc<Registry>>,
    Path(name): Path<String>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let handle = registry.get(&name)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, handle, query.id)))
}

/// One connection's read/write loop. Inbound frames are deserialized as
/// `Intent`s and forwarded to the session; outbound frames are whatever
/// the session broadcasts. Closing this socket only ends this loop — the
/// session and the table survive (spec.md §5 Cancellation).
async fn handle_socket(
    socket: WebSocket,
    handle: crate::session::SessionHandle,
    player_id: Option<PlayerId>,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    let conn_id = match handle.subscribe(player_id, tx.clone()).await {
        Ok(id) => id,
        Err(e) => {
            let body = serde_json::to_string(&ServerMessage::from(e)).unwrap_or_default();
            let _ = sink.send(Message::Text(body)).await;
            return;
        }
    };

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(body) = serde_json::to_string(&msg) else {
                continue;
            };
            if sink.send(Message::Text(body)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let intent: Intent = match serde_json::from_str(&text) {
            Ok(intent) => intent,
            Err(e) => {
                debug!("ws {}: malformed intent: {e}", handle.table_name);
                let _ = tx.send(ServerMessage::from(ApiError::InvalidInput)).await;
                continue;
            }
        };
        // Rejections are surfaced only to the originating connection
        // (spec.md §7): sent straight down this connection's own channel,
        // never broadcast.
        if let Err(e) = handle.apply_intent(player_id, intent).await {
            debug!("ws {}: rejected intent: {e}", handle.table_name);
            let _ = tx.send(ServerMessage::from(e)).await;
        }
    }

    handle.unsubscribe(conn_id);
    writer.abort();
}
