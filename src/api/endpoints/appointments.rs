//! Appointment endpoints.
//!
//! - `POST /api/appointments`: patient books a slot
//! - `GET /api/appointments`: patient's appointments
//! - `GET /api/appointments/pending`: doctor's open requests
//! - `GET /api/appointments/upcoming`: doctor's confirmed week
//! - `POST /api/appointments/:id/decision`: doctor confirms or rejects

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, SessionContext};
use crate::events::Event;
use crate::models::{parse_slot_instant, Appointment, Role};
use crate::scheduling::{self, Decision};

#[derive(Deserialize)]
pub struct BookRequest {
    pub doctor_id: Uuid,
    /// `YYYY-MM-DDTHH:MM:SS`
    pub slot_instant: String,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
}

pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<BookRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let patient = session.require(Role::Patient)?;
    let slot = parse_slot_instant(&body.slot_instant).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid slot instant: {}", body.slot_instant))
    })?;

    let mut conn = ctx.core.open_db()?;
    let appointment = scheduling::book_slot(
        &mut conn,
        patient,
        &body.doctor_id,
        slot,
        ctx.core.now(),
        ctx.core.config.past_slots,
    )?;
    ctx.core.events.publish(Event::AppointmentChanged {
        appointment: appointment.clone(),
    });
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn mine(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(scheduling::patient_appointments(&conn, &patient.id)?))
}

pub async fn pending(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let doctor = session.require(Role::Doctor)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(scheduling::pending_requests(&conn, &doctor.id)?))
}

pub async fn upcoming(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let doctor = session.require(Role::Doctor)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(scheduling::upcoming_confirmed(&conn, &doctor.id, ctx.core.now())?))
}

pub async fn decide(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let doctor = session.require(Role::Doctor)?;
    let appointment_id = parse_id(&id, "appointment")?;
    let conn = ctx.core.open_db()?;
    let appointment =
        scheduling::decide_appointment(&conn, &doctor.id, &appointment_id, body.decision)?;
    ctx.core.events.publish(Event::AppointmentChanged {
        appointment: appointment.clone(),
    });
    Ok(Json(appointment))
}
