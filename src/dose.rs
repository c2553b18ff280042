//! Dose-taken transition: log the dose, deplete stock, raise low-stock
//! notifications. All of it commits together or not at all.

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::*;

#[derive(Error, Debug)]
pub enum DoseError {
    #[error("Prescription not found: {0}")]
    PrescriptionNotFound(Uuid),

    #[error("Prescription {0} is no longer active")]
    PrescriptionInactive(Uuid),

    #[error("Medicine #{0} not found on this prescription")]
    MedicineNotFound(usize),

    #[error("{medicine} is not scheduled for {dose_time} on {date}")]
    NotScheduled {
        medicine: String,
        dose_time: DoseTime,
        date: NaiveDate,
    },

    #[error("This dose was already marked as taken")]
    AlreadyTaken,

    #[error("No doses of {0} remaining; record a purchase first")]
    OutOfStock(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for DoseError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

/// How the low-stock rule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LowStockPolicy {
    /// Fire on every dose that leaves the count inside the low band.
    #[default]
    Level,
    /// Fire once per crossing into the band; a purchase re-arms it.
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowStockRule {
    pub threshold: u32,
    pub policy: LowStockPolicy,
}

impl LowStockRule {
    /// Low band is `1..=threshold`; zero means the supply ran out, which is
    /// not a low-stock event.
    pub fn should_fire(&self, remaining: u32, already_alerted: bool) -> bool {
        let in_band = remaining > 0 && remaining <= self.threshold;
        match self.policy {
            LowStockPolicy::Level => in_band,
            LowStockPolicy::Edge => in_band && !already_alerted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoseOutcome {
    pub entry: MedicationLogEntry,
    pub remaining_count: u32,
    pub notifications: Vec<Notification>,
}

impl DoseOutcome {
    pub fn low_stock_fired(&self) -> bool {
        !self.notifications.is_empty()
    }
}

pub fn pharmacy_low_stock_message(patient_name: &str, medicine: &str) -> String {
    format!("Patient {patient_name} is running low on {medicine}.")
}

fn patient_low_stock_message(medicine: &str, remaining: u32) -> String {
    let unit = if remaining == 1 { "dose" } else { "doses" };
    format!("You are running low on {medicine}: {remaining} {unit} left.")
}

/// Mark one scheduled dose as taken on `today`.
pub fn mark_dose_taken(
    conn: &mut Connection,
    patient: &User,
    prescription_id: &Uuid,
    medicine_index: usize,
    dose_time: DoseTime,
    today: NaiveDate,
    rule: LowStockRule,
) -> Result<DoseOutcome, DoseError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let rx = match repository::get_prescription(&tx, prescription_id)? {
        Some(rx) if rx.patient_id == patient.id => rx,
        _ => return Err(DoseError::PrescriptionNotFound(*prescription_id)),
    };
    if rx.status != PrescriptionStatus::Active {
        return Err(DoseError::PrescriptionInactive(rx.id));
    }
    let medicine = rx
        .medicines
        .get(medicine_index)
        .ok_or(DoseError::MedicineNotFound(medicine_index))?;
    if !medicine.dose.includes(dose_time) || !medicine.covers(rx.start_date, today) {
        return Err(DoseError::NotScheduled {
            medicine: medicine.name.clone(),
            dose_time,
            date: today,
        });
    }

    let entry = MedicationLogEntry {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        prescription_id: rx.id,
        medicine_name: medicine.name.clone(),
        dose_time,
        date_taken: today,
        taken_at: Utc::now(),
    };
    match repository::insert_log_entry(&tx, &entry) {
        Ok(()) => {}
        Err(e) if e.is_constraint_violation() => return Err(DoseError::AlreadyTaken),
        Err(e) => return Err(e.into()),
    }

    // Dropping `tx` on any early return rolls the log entry back.
    let remaining = repository::decrement_remaining(&tx, &rx.id, medicine_index)?
        .ok_or_else(|| DoseError::OutOfStock(medicine.name.clone()))?;

    let mut notifications = Vec::new();
    if rule.should_fire(remaining, medicine.low_stock_alerted) {
        let mut to_pharmacy = Notification::new(
            NotificationTarget::Role(Role::Pharmacy),
            NotificationKind::LowStock,
            pharmacy_low_stock_message(&patient.name, &medicine.name),
        );
        to_pharmacy.patient_id = Some(patient.id);
        to_pharmacy.patient_name = Some(patient.name.clone());
        to_pharmacy.medicine_name = Some(medicine.name.clone());

        let mut to_patient = Notification::new(
            NotificationTarget::User(patient.id),
            NotificationKind::LowStock,
            patient_low_stock_message(&medicine.name, remaining),
        );
        to_patient.patient_id = Some(patient.id);
        to_patient.patient_name = Some(patient.name.clone());
        to_patient.medicine_name = Some(medicine.name.clone());

        repository::insert_notification(&tx, &to_pharmacy)?;
        repository::insert_notification(&tx, &to_patient)?;
        if rule.policy == LowStockPolicy::Edge {
            repository::set_low_stock_alerted(&tx, &rx.id, medicine_index, true)?;
        }
        notifications.push(to_pharmacy);
        notifications.push(to_patient);
    }

    tx.commit()?;

    tracing::info!(
        prescription_id = %rx.id,
        medicine = %entry.medicine_name,
        dose_time = dose_time.as_str(),
        remaining,
        low_stock = !notifications.is_empty(),
        "Dose taken"
    );
    Ok(DoseOutcome {
        entry,
        remaining_count: remaining,
        notifications,
    })
}
