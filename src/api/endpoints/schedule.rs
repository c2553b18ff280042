//! Doctor availability and the bookable slot grid.
//!
//! - `GET|PUT /api/availability`: the signed-in doctor's weekly template
//! - `GET /api/doctors/:id/availability`: any doctor's template
//! - `GET /api/doctors/:id/slots`: seven-day slot grid

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, SessionContext};
use crate::models::Role;
use crate::scheduling::{self, AvailabilityTemplate, FlatSlot, SchedulingError, SlotGrid};

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    /// Weekday name to "HH:MM" times.
    pub days: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub days: AvailabilityTemplate,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    #[serde(flatten)]
    pub grid: SlotGrid,
    pub flat: Vec<FlatSlot>,
}

pub async fn my_availability(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let doctor = session.require(Role::Doctor)?;
    let conn = ctx.core.open_db()?;
    let days = scheduling::load_availability(&conn, &doctor.id)?;
    Ok(Json(AvailabilityResponse { days }))
}

pub async fn save_availability(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let doctor = session.require(Role::Doctor)?;
    let template = AvailabilityTemplate::try_from(body.days).map_err(SchedulingError::from)?;
    let conn = ctx.core.open_db()?;
    scheduling::save_availability(&conn, &doctor.id, &template)?;
    Ok(Json(AvailabilityResponse { days: template }))
}

pub async fn doctor_availability(
    State(ctx): State<ApiContext>,
    Extension(_session): Extension<SessionContext>,
    Path(doctor_id): Path<String>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let doctor_id = parse_id(&doctor_id, "doctor")?;
    let conn = ctx.core.open_db()?;
    let days = scheduling::load_availability(&conn, &doctor_id)?;
    Ok(Json(AvailabilityResponse { days }))
}

pub async fn slots(
    State(ctx): State<ApiContext>,
    Extension(_session): Extension<SessionContext>,
    Path(doctor_id): Path<String>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let doctor_id = parse_id(&doctor_id, "doctor")?;
    let now = ctx.core.now();
    let conn = ctx.core.open_db()?;
    let grid = scheduling::doctor_slot_grid(
        &conn,
        &doctor_id,
        now.date(),
        now,
        ctx.core.config.past_slots,
    )?;
    let flat = grid.flatten();
    Ok(Json(SlotsResponse { grid, flat }))
}
