//! Pickers: doctors for booking, patients for prescribing.

use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::db::repository;
use crate::models::{Role, UserSummary};

/// `GET /api/doctors`
pub async fn doctors(
    State(ctx): State<ApiContext>,
    Extension(_session): Extension<SessionContext>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(repository::list_users_by_role(&conn, Role::Doctor)?))
}

/// `GET /api/patients`: doctors only.
pub async fn patients(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    session.require(Role::Doctor)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(repository::list_users_by_role(&conn, Role::Patient)?))
}
