//! Account endpoints.
//!
//! - `POST /api/auth/register`: create an account and sign in
//! - `POST /api/auth/login`: email + password sign-in
//! - `POST /api/auth/logout`: end the current session
//! - `GET /api/auth/me`: the signed-in user

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::auth;
use crate::models::{Role, User};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    pub landing_page: &'static str,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    pub landing_page: &'static str,
}

fn signed_in(ctx: &ApiContext, user: User) -> AuthResponse {
    let landing_page = user.role.landing_page();
    let token = ctx.core.sessions.issue(user.clone());
    AuthResponse {
        token,
        user,
        landing_page,
    }
}

/// Run password hashing on the blocking pool; PBKDF2 would otherwise stall
/// a runtime worker for the whole derivation.
async fn off_runtime<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Credential task failed: {e}")))?
}

pub async fn register(
    State(ctx): State<ApiContext>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let core = ctx.core.clone();
    let user = off_runtime(move || {
        let conn = core.open_db()?;
        Ok(auth::register(&conn, &body.name, &body.email, &body.password, body.role)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(signed_in(&ctx, user))))
}

pub async fn login(
    State(ctx): State<ApiContext>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let core = ctx.core.clone();
    let user = off_runtime(move || {
        let conn = core.open_db()?;
        Ok(auth::authenticate(&conn, &body.email, &body.password)?)
    })
    .await?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "Signed in");
    Ok(Json(signed_in(&ctx, user)))
}

pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> StatusCode {
    ctx.core.sessions.revoke(&session.token);
    StatusCode::NO_CONTENT
}

pub async fn me(Extension(session): Extension<SessionContext>) -> Json<MeResponse> {
    let landing_page = session.user.role.landing_page();
    Json(MeResponse {
        user: session.user,
        landing_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn credential_work_leaves_the_runtime_thread() {
        let runtime_thread = std::thread::current().id();
        let worker = off_runtime(|| Ok(std::thread::current().id())).await.unwrap();
        assert_ne!(worker, runtime_thread);
    }

    #[tokio::test]
    async fn credential_errors_pass_through() {
        let err = off_runtime(|| -> Result<(), ApiError> {
            Err(auth::AuthError::InvalidCredential.into())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn panicking_credential_task_is_internal() {
        let err = off_runtime(|| -> Result<(), ApiError> { panic!("hash failed") })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
