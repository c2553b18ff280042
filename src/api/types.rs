//! Shared types for the API layer.

use std::sync::Arc;

use uuid::Uuid;

use crate::api::error::ApiError;
use crate::auth;
use crate::core_state::CoreState;
use crate::models::{Role, User};

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Session context: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Signed-in user, injected into request extensions by the auth
/// middleware after the bearer token was accepted.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user: User,
    pub token: String,
}

impl SessionContext {
    /// Gate a role-specific endpoint.
    pub fn require(&self, role: Role) -> Result<&User, ApiError> {
        auth::require_role(&self.user, role).map_err(ApiError::from)?;
        Ok(&self.user)
    }
}

/// Parse a UUID path or body segment.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what} ID format")))
}
