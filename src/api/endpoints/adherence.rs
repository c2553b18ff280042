//! Adherence reports.
//!
//! - `GET /api/adherence`: the signed-in patient's own report
//! - `GET /api/patients/:id/adherence`: a doctor's view of any patient

use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::adherence::{self, AdherenceReport};
use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, SessionContext};
use crate::db::repository;
use crate::models::Role;

pub async fn mine(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<AdherenceReport>, ApiError> {
    let patient = session.require(Role::Patient)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(adherence::patient_adherence(&conn, &patient.id, ctx.core.now().date())?))
}

pub async fn for_patient(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<AdherenceReport>, ApiError> {
    session.require(Role::Doctor)?;
    let patient_id = parse_id(&id, "patient")?;
    let conn = ctx.core.open_db()?;
    match repository::get_user(&conn, &patient_id)? {
        Some(user) if user.role == Role::Patient => {}
        _ => return Err(ApiError::NotFound(format!("Patient not found: {patient_id}"))),
    }
    Ok(Json(adherence::patient_adherence(&conn, &patient_id, ctx.core.now().date())?))
}
