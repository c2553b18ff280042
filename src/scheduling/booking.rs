//! Booking write path and appointment lifecycle.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::grid::{build_slot_grid, SlotGrid};
use super::template::AvailabilityTemplate;
use super::{PastSlotPolicy, SchedulingError};
use crate::db::repository;
use crate::models::{Appointment, AppointmentStatus, Role, User};

/// Doctor's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Confirmed,
    Rejected,
}

impl From<Decision> for AppointmentStatus {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Confirmed => AppointmentStatus::Confirmed,
            Decision::Rejected => AppointmentStatus::Rejected,
        }
    }
}

fn require_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<User, SchedulingError> {
    match repository::get_user(conn, doctor_id)? {
        Some(user) if user.role == Role::Doctor => Ok(user),
        _ => Err(SchedulingError::UnknownDoctor(*doctor_id)),
    }
}

pub fn save_availability(
    conn: &Connection,
    doctor_id: &Uuid,
    template: &AvailabilityTemplate,
) -> Result<(), SchedulingError> {
    require_doctor(conn, doctor_id)?;
    repository::set_availability(conn, doctor_id, template)?;
    tracing::info!(doctor_id = %doctor_id, "Availability saved");
    Ok(())
}

/// The doctor's template; empty when none was saved yet.
pub fn load_availability(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<AvailabilityTemplate, SchedulingError> {
    require_doctor(conn, doctor_id)?;
    Ok(repository::get_availability(conn, doctor_id)?.unwrap_or_default())
}

pub fn doctor_slot_grid(
    conn: &Connection,
    doctor_id: &Uuid,
    today: NaiveDate,
    now: NaiveDateTime,
    policy: PastSlotPolicy,
) -> Result<SlotGrid, SchedulingError> {
    let template = load_availability(conn, doctor_id)?;
    let appointments = repository::get_live_appointments_for_doctor(conn, doctor_id)?;
    Ok(build_slot_grid(*doctor_id, &template, &appointments, today, now, policy))
}

/// Create a pending appointment for `patient` at `slot`.
///
/// Only a slot the grid for `now` would render is bookable: the template
/// must offer it, it must fall inside the seven-day window, and under
/// `PastSlotPolicy::Hide` it must not have started. The pre-check gives a
/// clean error in the common case; the partial unique index on live
/// (doctor, slot) pairs is what decides a race.
pub fn book_slot(
    conn: &mut Connection,
    patient: &User,
    doctor_id: &Uuid,
    slot: NaiveDateTime,
    now: NaiveDateTime,
    policy: PastSlotPolicy,
) -> Result<Appointment, SchedulingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let doctor = require_doctor(&tx, doctor_id)?;
    let template = repository::get_availability(&tx, doctor_id)?.unwrap_or_default();
    if !template.offers(&slot) {
        return Err(SchedulingError::SlotNotOffered(slot));
    }

    let live = repository::get_live_appointments_for_doctor(&tx, doctor_id)?;
    let grid = build_slot_grid(*doctor_id, &template, &live, now.date(), now, policy);
    match grid.slot(&slot) {
        None => {
            tracing::debug!(doctor_id = %doctor_id, %slot, %now, "Slot outside the grid window");
            return Err(SchedulingError::SlotNotOffered(slot));
        }
        Some(s) if s.is_booked => {
            tracing::debug!(doctor_id = %doctor_id, %slot, "Slot taken at pre-check");
            return Err(SchedulingError::SlotAlreadyBooked);
        }
        Some(_) => {}
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        patient_name: patient.name.clone(),
        doctor_id: doctor.id,
        doctor_name: doctor.name,
        slot_instant: slot,
        status: AppointmentStatus::Pending,
        created_at: Utc::now(),
    };

    match repository::insert_appointment(&tx, &appointment) {
        Ok(()) => {}
        Err(e) if e.is_constraint_violation() => return Err(SchedulingError::SlotAlreadyBooked),
        Err(e) => return Err(e.into()),
    }
    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment.id,
        doctor_id = %doctor_id,
        %slot,
        "Appointment requested"
    );
    Ok(appointment)
}

/// Confirm or reject a pending request addressed to `doctor_id`.
pub fn decide_appointment(
    conn: &Connection,
    doctor_id: &Uuid,
    appointment_id: &Uuid,
    decision: Decision,
) -> Result<Appointment, SchedulingError> {
    let status = AppointmentStatus::from(decision);
    let applied = repository::update_status_if_pending(conn, appointment_id, doctor_id, status)?;

    let appointment = match repository::get_appointment(conn, appointment_id)? {
        Some(a) if a.doctor_id == *doctor_id => a,
        _ => return Err(SchedulingError::AppointmentNotFound(*appointment_id)),
    };
    if !applied {
        return Err(SchedulingError::NotPending);
    }

    tracing::info!(
        appointment_id = %appointment_id,
        status = status.as_str(),
        "Appointment decided"
    );
    Ok(appointment)
}

pub fn patient_appointments(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, SchedulingError> {
    Ok(repository::get_appointments_for_patient(conn, patient_id)?)
}

pub fn pending_requests(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Appointment>, SchedulingError> {
    Ok(repository::get_pending_for_doctor(conn, doctor_id)?)
}

/// Confirmed appointments from `now` through the next seven days.
pub fn upcoming_confirmed(
    conn: &Connection,
    doctor_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Vec<Appointment>, SchedulingError> {
    let until = now + Duration::days(7);
    Ok(repository::get_confirmed_for_doctor_between(conn, doctor_id, &now, &until)?)
}
