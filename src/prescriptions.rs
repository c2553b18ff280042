//! Prescriptions: doctor-side creation, patient-side purchases, and the
//! patient's dose schedule for today.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::*;

#[derive(Error, Debug)]
pub enum PrescriptionError {
    #[error("Please select a patient")]
    MissingPatient,

    #[error("Patient not found: {0}")]
    UnknownPatient(Uuid),

    #[error("Please add at least one medicine")]
    NoMedicines,

    #[error("Medicine #{0} needs a name")]
    BlankMedicineName(usize),

    #[error("Medicine #{0} needs a number of days greater than zero")]
    ZeroDays(usize),

    #[error("Prescription not found: {0}")]
    NotFound(Uuid),

    #[error("Medicine #{0} not found on this prescription")]
    MedicineNotFound(usize),

    #[error("Stock count must be greater than zero")]
    InvalidStockCount,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for PrescriptionError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

// ═══════════════════════════════════════════
// Input and view types
// ═══════════════════════════════════════════

/// One medicine line on the doctor's prescription form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    pub total_days: u32,
    #[serde(default)]
    pub dose: DoseSchedule,
}

/// A dose due today, as shown on the patient dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledDose {
    pub prescription_id: Uuid,
    pub medicine_index: usize,
    pub medicine_name: String,
    pub dose_time: DoseTime,
    pub remaining_count: u32,
    pub taken: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodaySchedule {
    pub morning: Vec<ScheduledDose>,
    pub noon: Vec<ScheduledDose>,
    pub night: Vec<ScheduledDose>,
}

impl TodaySchedule {
    pub fn slot(&self, time: DoseTime) -> &[ScheduledDose] {
        match time {
            DoseTime::Morning => &self.morning,
            DoseTime::Noon => &self.noon,
            DoseTime::Night => &self.night,
        }
    }

    fn slot_mut(&mut self, time: DoseTime) -> &mut Vec<ScheduledDose> {
        match time {
            DoseTime::Morning => &mut self.morning,
            DoseTime::Noon => &mut self.noon,
            DoseTime::Night => &mut self.night,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.morning.is_empty() && self.noon.is_empty() && self.night.is_empty()
    }
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

/// Check the doctor's form. Nothing is written when this fails.
pub fn validate_new_prescription(
    patient_id: Option<&Uuid>,
    medicines: &[NewMedicine],
) -> Result<(), PrescriptionError> {
    if patient_id.is_none() {
        return Err(PrescriptionError::MissingPatient);
    }
    if medicines.is_empty() {
        return Err(PrescriptionError::NoMedicines);
    }
    for (index, med) in medicines.iter().enumerate() {
        if med.name.trim().is_empty() {
            return Err(PrescriptionError::BlankMedicineName(index + 1));
        }
        if med.total_days == 0 {
            return Err(PrescriptionError::ZeroDays(index + 1));
        }
    }
    Ok(())
}

/// Issue a prescription starting `today`. Counters start at zero until the
/// patient records a purchase.
pub fn create_prescription(
    conn: &mut Connection,
    doctor: &User,
    patient_id: Option<Uuid>,
    medicines: Vec<NewMedicine>,
    today: NaiveDate,
) -> Result<Prescription, PrescriptionError> {
    validate_new_prescription(patient_id.as_ref(), &medicines)?;
    let Some(patient_id) = patient_id else {
        return Err(PrescriptionError::MissingPatient);
    };

    let tx = conn.transaction()?;
    let patient = match repository::get_user(&tx, &patient_id)? {
        Some(user) if user.role == Role::Patient => user,
        _ => return Err(PrescriptionError::UnknownPatient(patient_id)),
    };

    let prescription = Prescription {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        patient_name: patient.name,
        doctor_id: doctor.id,
        doctor_name: doctor.name.clone(),
        start_date: today,
        status: PrescriptionStatus::Active,
        medicines: medicines
            .into_iter()
            .map(|m| Medicine {
                name: m.name.trim().to_string(),
                total_days: m.total_days,
                dose: m.dose,
                stock_count: 0,
                remaining_count: 0,
                low_stock_alerted: false,
            })
            .collect(),
        created_at: Utc::now(),
    };
    repository::insert_prescription(&tx, &prescription)?;
    tx.commit()?;

    tracing::info!(
        prescription_id = %prescription.id,
        patient_id = %prescription.patient_id,
        medicines = prescription.medicines.len(),
        "Prescription issued"
    );
    Ok(prescription)
}

pub fn active_prescriptions(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Prescription>, PrescriptionError> {
    Ok(repository::get_active_prescriptions_for_patient(conn, patient_id)?)
}

/// Load a prescription that belongs to `patient_id`. Someone else's
/// prescription reads as not found.
pub fn owned_prescription(
    conn: &Connection,
    patient_id: &Uuid,
    prescription_id: &Uuid,
) -> Result<Prescription, PrescriptionError> {
    match repository::get_prescription(conn, prescription_id)? {
        Some(rx) if rx.patient_id == *patient_id => Ok(rx),
        _ => Err(PrescriptionError::NotFound(*prescription_id)),
    }
}

/// The patient bought `count` doses: both counters become `count` and the
/// low-stock alert is re-armed.
pub fn record_purchase(
    conn: &Connection,
    patient_id: &Uuid,
    prescription_id: &Uuid,
    medicine_index: usize,
    count: i64,
) -> Result<Medicine, PrescriptionError> {
    let count = u32::try_from(count)
        .ok()
        .filter(|c| *c > 0)
        .ok_or(PrescriptionError::InvalidStockCount)?;

    let rx = owned_prescription(conn, patient_id, prescription_id)?;
    if medicine_index >= rx.medicines.len() {
        return Err(PrescriptionError::MedicineNotFound(medicine_index));
    }
    if !repository::set_medicine_stock(conn, prescription_id, medicine_index, count)? {
        return Err(PrescriptionError::MedicineNotFound(medicine_index));
    }

    tracing::info!(prescription_id = %prescription_id, medicine_index, count, "Stock recorded");
    let mut medicine = rx.medicines[medicine_index].clone();
    medicine.stock_count = count;
    medicine.remaining_count = count;
    medicine.low_stock_alerted = false;
    Ok(medicine)
}

/// Group today's due doses by time of day.
///
/// Medicines without stock, with nothing remaining, or whose course does not
/// include `today` are left out.
pub fn todays_schedule(
    prescriptions: &[Prescription],
    todays_log: &[MedicationLogEntry],
    today: NaiveDate,
) -> TodaySchedule {
    let mut schedule = TodaySchedule::default();

    for rx in prescriptions {
        for (index, med) in rx.medicines.iter().enumerate() {
            if !med.has_supply() || !med.covers(rx.start_date, today) {
                continue;
            }
            for time in med.dose.times() {
                let taken = todays_log.iter().any(|e| {
                    e.prescription_id == rx.id
                        && e.medicine_name == med.name
                        && e.dose_time == time
                        && e.date_taken == today
                });
                schedule.slot_mut(time).push(ScheduledDose {
                    prescription_id: rx.id,
                    medicine_index: index,
                    medicine_name: med.name.clone(),
                    dose_time: time,
                    remaining_count: med.remaining_count,
                    taken,
                });
            }
        }
    }
    schedule
}

pub fn patient_schedule_for(
    conn: &Connection,
    patient_id: &Uuid,
    today: NaiveDate,
) -> Result<TodaySchedule, PrescriptionError> {
    let prescriptions = repository::get_active_prescriptions_for_patient(conn, patient_id)?;
    let log = repository::get_log_for_patient_on(conn, patient_id, today)?;
    Ok(todays_schedule(&prescriptions, &log, today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn line(name: &str, days: u32) -> NewMedicine {
        NewMedicine {
            name: name.into(),
            total_days: days,
            dose: DoseSchedule { morning: true, noon: false, night: true },
        }
    }

    #[test]
    fn validation_blocks_incomplete_forms() {
        let patient = Uuid::new_v4();
        assert!(matches!(
            validate_new_prescription(None, &[line("A", 1)]),
            Err(PrescriptionError::MissingPatient)
        ));
        assert!(matches!(
            validate_new_prescription(Some(&patient), &[]),
            Err(PrescriptionError::NoMedicines)
        ));
        assert!(matches!(
            validate_new_prescription(Some(&patient), &[line("A", 1), line("  ", 1)]),
            Err(PrescriptionError::BlankMedicineName(2))
        ));
        assert!(matches!(
            validate_new_prescription(Some(&patient), &[line("A", 0)]),
            Err(PrescriptionError::ZeroDays(1))
        ));
    }

    #[test]
    fn create_starts_today_with_empty_counters() {
        let mut conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let patient = fixtures::user(&conn, "Ana", Role::Patient);

        let lines = vec![line(" Zinc ", 5)];
        let rx = create_prescription(&mut conn, &doctor, Some(patient.id), lines, today()).unwrap();
        assert_eq!(rx.start_date, today());
        assert_eq!(rx.status, PrescriptionStatus::Active);
        assert_eq!(rx.medicines[0].name, "Zinc");
        assert_eq!(rx.medicines[0].remaining_count, 0);

        let active = active_prescriptions(&conn, &patient.id).unwrap();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn create_for_non_patient_fails_without_writing() {
        let mut conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let lines = vec![line("Zinc", 5)];
        let err =
            create_prescription(&mut conn, &doctor, Some(doctor.id), lines, today()).unwrap_err();
        assert!(matches!(err, PrescriptionError::UnknownPatient(_)));
        assert!(active_prescriptions(&conn, &doctor.id).unwrap().is_empty());
    }

    #[test]
    fn purchase_sets_counters_and_checks_owner() {
        let mut conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let patient = fixtures::user(&conn, "Ana", Role::Patient);
        let other = fixtures::user(&conn, "Ben", Role::Patient);
        let lines = vec![line("Zinc", 5)];
        let rx = create_prescription(&mut conn, &doctor, Some(patient.id), lines, today()).unwrap();

        assert!(matches!(
            record_purchase(&conn, &patient.id, &rx.id, 0, 0),
            Err(PrescriptionError::InvalidStockCount)
        ));
        assert!(matches!(
            record_purchase(&conn, &patient.id, &rx.id, 0, -3),
            Err(PrescriptionError::InvalidStockCount)
        ));
        assert!(matches!(
            record_purchase(&conn, &other.id, &rx.id, 0, 10),
            Err(PrescriptionError::NotFound(_))
        ));
        assert!(matches!(
            record_purchase(&conn, &patient.id, &rx.id, 3, 10),
            Err(PrescriptionError::MedicineNotFound(3))
        ));

        let med = record_purchase(&conn, &patient.id, &rx.id, 0, 10).unwrap();
        assert_eq!((med.stock_count, med.remaining_count), (10, 10));
    }

    #[test]
    fn schedule_skips_unstocked_and_finished_courses() {
        let conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let patient = fixtures::user(&conn, "Ana", Role::Patient);
        let both = DoseSchedule { morning: true, noon: false, night: true };
        let rx = fixtures::prescription(
            &conn,
            &patient,
            &doctor,
            today().pred_opt().unwrap(),
            vec![
                fixtures::medicine("Zinc", 5, both, 4),
                fixtures::medicine("Empty", 5, both, 0),
                fixtures::medicine("Done", 1, both, 4),
            ],
        );

        let log = vec![MedicationLogEntry {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            prescription_id: rx.id,
            medicine_name: "Zinc".into(),
            dose_time: DoseTime::Morning,
            date_taken: today(),
            taken_at: Utc::now(),
        }];
        let schedule = todays_schedule(&[rx.clone()], &log, today());
        assert_eq!(schedule.morning.len(), 1);
        assert!(schedule.morning[0].taken);
        assert!(schedule.noon.is_empty());
        assert_eq!(schedule.night.len(), 1);
        assert!(!schedule.night[0].taken);
        assert_eq!(schedule.slot(DoseTime::Night)[0].medicine_name, "Zinc");

        let from_db = patient_schedule_for(&conn, &patient.id, today()).unwrap();
        assert_eq!(from_db.morning.len(), 1);
        assert!(!from_db.morning[0].taken);
    }
}
