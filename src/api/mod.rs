//! HTTP + WebSocket API for the clinic portal.
//!
//! Routes are nested under `/api/`. Session-protected routes pass through
//! Auth → Audit before the handler; registration, login, health and news
//! are open. Live events stream over `/ws/subscribe`.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;
pub mod websocket;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
