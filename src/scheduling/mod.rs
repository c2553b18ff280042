//! Appointment scheduling: doctor availability templates, the rolling
//! seven-day slot grid, and the booking write path.

pub mod booking;
pub mod grid;
pub mod template;

pub use booking::*;
pub use grid::*;
pub use template::*;

use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Invalid availability: {0}")]
    InvalidTemplate(#[from] TemplateError),

    #[error("Doctor not found: {0}")]
    UnknownDoctor(Uuid),

    #[error("Slot {0} is not offered by this doctor")]
    SlotNotOffered(NaiveDateTime),

    #[error("This slot is already booked")]
    SlotAlreadyBooked,

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(Uuid),

    #[error("Appointment has already been decided")]
    NotPending,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

/// Whether today's slots that already started stay in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PastSlotPolicy {
    #[default]
    Show,
    Hide,
}
