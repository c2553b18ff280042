//! Prescription and dose endpoints.
//!
//! - `POST /api/prescriptions`: doctor writes a prescription
//! - `GET /api/prescriptions`: patient's active prescriptions
//! - `GET /api/prescriptions/today`: today's doses by time of day
//! - `POST /api/prescriptions/:id/medicines/:index/purchase`: record stock
//! - `POST /api/prescriptions/:id/medicines/:index/doses`: mark a dose taken

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, SessionContext};
use crate::dose::{self, DoseOutcome};
use crate::events::Event;
use crate::models::{DoseTime, Medicine, Prescription, Role};
use crate::prescriptions::{self, NewMedicine, TodaySchedule};

#[derive(Deserialize)]
pub struct CreateRequest {
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub medicines: Vec<NewMedicine>,
}

#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub count: i64,
}

#[derive(Deserialize)]
pub struct DoseRequest {
    pub dose_time: DoseTime,
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Prescription>), ApiError> {
    let doctor = session.require(Role::Doctor)?;
    let mut conn = ctx.core.open_db()?;
    let rx = prescriptions::create_prescription(
        &mut conn,
        doctor,
        body.patient_id,
        body.medicines,
        ctx.core.now().date(),
    )?;
    Ok((StatusCode::CREATED, Json(rx)))
}

pub async fn active(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(prescriptions::active_prescriptions(&conn, &patient.id)?))
}

pub async fn today(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<TodaySchedule>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let conn = ctx.core.open_db()?;
    let schedule = prescriptions::patient_schedule_for(&conn, &patient.id, ctx.core.now().date())?;
    Ok(Json(schedule))
}

pub async fn purchase(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path((id, index)): Path<(String, usize)>,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<Medicine>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let prescription_id = parse_id(&id, "prescription")?;
    let conn = ctx.core.open_db()?;
    let medicine =
        prescriptions::record_purchase(&conn, &patient.id, &prescription_id, index, body.count)?;
    Ok(Json(medicine))
}

pub async fn take_dose(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path((id, index)): Path<(String, usize)>,
    Json(body): Json<DoseRequest>,
) -> Result<Json<DoseOutcome>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let prescription_id = parse_id(&id, "prescription")?;
    let mut conn = ctx.core.open_db()?;
    let outcome = dose::mark_dose_taken(
        &mut conn,
        patient,
        &prescription_id,
        index,
        body.dose_time,
        ctx.core.now().date(),
        ctx.core.low_stock_rule(),
    )?;

    ctx.core.events.publish(Event::DoseTaken {
        entry: outcome.entry.clone(),
        remaining_count: outcome.remaining_count,
    });
    for notification in &outcome.notifications {
        ctx.core.events.publish(Event::NotificationCreated {
            notification: notification.clone(),
        });
    }
    Ok(Json(outcome))
}
