//! API endpoint handlers, grouped by feature.

pub mod adherence;
pub mod appointments;
pub mod auth;
pub mod chat;
pub mod community;
pub mod directory;
pub mod health;
pub mod news;
pub mod notifications;
pub mod prescriptions;
pub mod schedule;
