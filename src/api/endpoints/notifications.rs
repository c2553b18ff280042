//! Notification endpoints.
//!
//! - `GET /api/notifications`: the signed-in user's inbox
//! - `POST /api/notifications/:id/read`
//! - `GET /api/pharmacy/alerts`: unread low-stock alerts
//! - `POST /api/pharmacy/alerts/:id/offer`: answer an alert with an offer

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, SessionContext};
use crate::events::Event;
use crate::models::{Notification, Role};
use crate::notifications;

#[derive(Deserialize)]
pub struct OfferRequest {
    pub message: String,
}

pub async fn inbox(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(notifications::user_inbox(&conn, &session.user.id)?))
}

pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let notification_id = parse_id(&id, "notification")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(notifications::mark_read(&conn, &session.user, &notification_id)?))
}

pub async fn pharmacy_alerts(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    session.require(Role::Pharmacy)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(notifications::pharmacy_inbox(&conn)?))
}

pub async fn send_offer(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<OfferRequest>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let pharmacy = session.require(Role::Pharmacy)?;
    let notification_id = parse_id(&id, "notification")?;
    let mut conn = ctx.core.open_db()?;
    let offer = notifications::send_offer(&mut conn, pharmacy, &notification_id, &body.message)?;
    ctx.core.events.publish(Event::NotificationCreated {
        notification: offer.clone(),
    });
    Ok((StatusCode::CREATED, Json(offer)))
}
