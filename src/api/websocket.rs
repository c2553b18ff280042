//! WebSocket endpoint streaming live events for one topic.
//!
//! Connection lifecycle:
//! 1. Client opens `GET /ws/subscribe?token=xxx&topic=community`
//! 2. Token and topic are checked, a `Subscription` is opened, WS upgraded
//! 3. Server sends `subscribed`, then every event on the topic as JSON
//! 4. Ping every 30s; 3 unanswered pings = disconnect
//! 5. Session max 1h, then the client reconnects
//! 6. Each heartbeat re-checks the token; after logout the stream ends
//!
//! The subscription is owned by the connection task and dropped with it.

use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::events::{Event, Subscription, Topic};
use crate::models::User;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const SESSION_MAX: Duration = Duration::from_secs(3600);

/// Disconnect after this many unanswered pings (3 × 30s = 90s).
const MAX_MISSED_HEARTBEATS: u32 = 3;

#[derive(Deserialize)]
pub struct WsSubscribeQuery {
    token: String,
    topic: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsOutgoing<'a> {
    Subscribed { topic: String },
    Event { event: &'a Event },
    SessionExpired,
    SignedOut,
}

// ═══════════════════════════════════════════════════════════
// WsSessionState: heartbeat bookkeeping
// ═══════════════════════════════════════════════════════════

#[derive(Debug, PartialEq)]
pub(crate) enum HeartbeatAction {
    SendPing,
    SessionExpired,
    SignedOut,
    HeartbeatTimeout,
}

pub(crate) struct WsSessionState {
    session_start: Instant,
    missed_heartbeats: u32,
}

impl WsSessionState {
    fn new() -> Self {
        Self::with_start(Instant::now())
    }

    fn with_start(start: Instant) -> Self {
        Self {
            session_start: start,
            missed_heartbeats: 0,
        }
    }

    fn on_pong(&mut self) {
        self.missed_heartbeats = 0;
    }

    /// `signed_in` is whether the connection's token still resolves.
    fn on_heartbeat_tick(&mut self, signed_in: bool) -> HeartbeatAction {
        if !signed_in {
            return HeartbeatAction::SignedOut;
        }
        if self.session_start.elapsed() >= SESSION_MAX {
            return HeartbeatAction::SessionExpired;
        }
        if self.missed_heartbeats >= MAX_MISSED_HEARTBEATS {
            return HeartbeatAction::HeartbeatTimeout;
        }
        self.missed_heartbeats += 1;
        HeartbeatAction::SendPing
    }
}

/// Resolve the token and check the user may listen on the topic.
pub(crate) fn authorize_subscription(
    ctx: &ApiContext,
    query: &WsSubscribeQuery,
) -> Result<(User, Topic), ApiError> {
    let user = ctx.core.sessions.current(&query.token)?;
    let topic: Topic = query
        .topic
        .parse()
        .map_err(|e: crate::events::InvalidTopic| ApiError::BadRequest(e.to_string()))?;
    if !topic.visible_to(&user) {
        return Err(ApiError::Forbidden(format!("Cannot subscribe to {topic}")));
    }
    Ok((user, topic))
}

fn still_signed_in(ctx: &ApiContext, token: &str) -> bool {
    ctx.core.sessions.current(token).is_ok()
}

/// WebSocket upgrade handler.
pub async fn ws_subscribe(
    ws: WebSocketUpgrade,
    State(ctx): State<ApiContext>,
    Query(query): Query<WsSubscribeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, topic) = authorize_subscription(&ctx, &query)?;
    let subscription = ctx.core.events.subscribe(topic);
    tracing::info!(user_id = %user.id, topic = %topic, "WebSocket upgrade accepted");
    Ok(ws.on_upgrade(move |socket| handle_ws(socket, ctx, query.token, subscription, user.id)))
}

fn to_text(msg: &WsOutgoing<'_>) -> Option<Message> {
    serde_json::to_string(msg).ok().map(Message::Text)
}

async fn handle_ws(
    socket: WebSocket,
    ctx: ApiContext,
    token: String,
    mut subscription: Subscription,
    user_id: Uuid,
) {
    let (mut sink, mut stream) = socket.split();

    let hello = WsOutgoing::Subscribed {
        topic: subscription.topic().to_string(),
    };
    if let Some(msg) = to_text(&hello) {
        if sink.send(msg).await.is_err() {
            return;
        }
    }

    let mut session = WsSessionState::new();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // Consume initial immediate tick

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else { break };
                let Some(msg) = to_text(&WsOutgoing::Event { event: &event }) else { continue };
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => session.on_pong(),
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {} // clients do not send commands
                }
            }
            _ = heartbeat.tick() => {
                match session.on_heartbeat_tick(still_signed_in(&ctx, &token)) {
                    HeartbeatAction::SendPing => {
                        if sink.send(Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                    HeartbeatAction::SessionExpired => {
                        if let Some(msg) = to_text(&WsOutgoing::SessionExpired) {
                            let _ = sink.send(msg).await;
                        }
                        break;
                    }
                    HeartbeatAction::SignedOut => {
                        if let Some(msg) = to_text(&WsOutgoing::SignedOut) {
                            let _ = sink.send(msg).await;
                        }
                        tracing::info!(user_id = %user_id, "Session revoked, closing stream");
                        break;
                    }
                    HeartbeatAction::HeartbeatTimeout => {
                        tracing::info!(
                            user_id = %user_id,
                            "{MAX_MISSED_HEARTBEATS} missed heartbeats, disconnecting"
                        );
                        break;
                    }
                }
            }
        }
    }

    let _ = sink.close().await;
    drop(subscription);
    tracing::info!(user_id = %user_id, "WebSocket disconnected");
}
