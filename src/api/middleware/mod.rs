//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator: bearer token to `SessionContext`
//! 2. Access log: runs after auth, has the user id

pub mod audit;
pub mod auth;
