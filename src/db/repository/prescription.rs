use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{date_from_db, timestamp_from_db, timestamp_to_db, uuid_from_db};
use crate::db::DatabaseError;
use crate::models::*;

/// Insert a prescription and its medicines. Callers wanting atomicity pass
/// a `Transaction`.
pub fn insert_prescription(conn: &Connection, rx: &Prescription) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, patient_id, patient_name, doctor_id, doctor_name,
         start_date, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            rx.id.to_string(),
            rx.patient_id.to_string(),
            rx.patient_name,
            rx.doctor_id.to_string(),
            rx.doctor_name,
            rx.start_date.to_string(),
            rx.status.as_str(),
            timestamp_to_db(&rx.created_at),
        ],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO prescription_medicines (prescription_id, position, name, total_days,
         dose_morning, dose_noon, dose_night, stock_count, remaining_count, low_stock_alerted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for (position, med) in rx.medicines.iter().enumerate() {
        stmt.execute(params![
            rx.id.to_string(),
            position as i64,
            med.name,
            med.total_days,
            med.dose.morning as i32,
            med.dose.noon as i32,
            med.dose.night as i32,
            med.stock_count,
            med.remaining_count,
            med.low_stock_alerted as i32,
        ])?;
    }
    Ok(())
}

pub fn get_prescription(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Prescription>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, patient_name, doctor_id, doctor_name, start_date, status,
                    created_at
             FROM prescriptions WHERE id = ?1",
            params![id.to_string()],
            prescription_row_from_rusqlite,
        )
        .optional()?;

    match row {
        Some(row) => {
            let medicines = get_medicines(conn, id)?;
            Ok(Some(prescription_from_row(row, medicines)?))
        }
        None => Ok(None),
    }
}

/// Active prescriptions of a patient, oldest first.
pub fn get_active_prescriptions_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, patient_name, doctor_id, doctor_name, start_date, status, created_at
         FROM prescriptions WHERE patient_id = ?1 AND status = 'active'
         ORDER BY start_date, created_at",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], prescription_row_from_rusqlite)?;

    let mut prescriptions = Vec::new();
    for row in rows {
        let row = row?;
        let id = uuid_from_db("prescriptions.id", &row.id)?;
        let medicines = get_medicines(conn, &id)?;
        prescriptions.push(prescription_from_row(row, medicines)?);
    }
    Ok(prescriptions)
}

pub fn get_medicines(
    conn: &Connection,
    prescription_id: &Uuid,
) -> Result<Vec<Medicine>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, total_days, dose_morning, dose_noon, dose_night, stock_count,
         remaining_count, low_stock_alerted
         FROM prescription_medicines WHERE prescription_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![prescription_id.to_string()], |row| {
        Ok(Medicine {
            name: row.get(0)?,
            total_days: row.get(1)?,
            dose: DoseSchedule {
                morning: row.get::<_, i32>(2)? != 0,
                noon: row.get::<_, i32>(3)? != 0,
                night: row.get::<_, i32>(4)? != 0,
            },
            stock_count: row.get(5)?,
            remaining_count: row.get(6)?,
            low_stock_alerted: row.get::<_, i32>(7)? != 0,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Set both counters to `count` after a purchase and re-arm the low-stock
/// alert. Returns false when the medicine does not exist.
pub fn set_medicine_stock(
    conn: &Connection,
    prescription_id: &Uuid,
    position: usize,
    count: u32,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE prescription_medicines
         SET stock_count = ?1, remaining_count = ?1, low_stock_alerted = 0
         WHERE prescription_id = ?2 AND position = ?3",
        params![count, prescription_id.to_string(), position as i64],
    )?;
    Ok(updated == 1)
}

/// Decrement `remaining_count` by one if it is positive.
/// Returns the new count, or `None` when nothing was left to take.
pub fn decrement_remaining(
    conn: &Connection,
    prescription_id: &Uuid,
    position: usize,
) -> Result<Option<u32>, DatabaseError> {
    let remaining = conn
        .query_row(
            "UPDATE prescription_medicines SET remaining_count = remaining_count - 1
             WHERE prescription_id = ?1 AND position = ?2 AND remaining_count > 0
             RETURNING remaining_count",
            params![prescription_id.to_string(), position as i64],
            |row| row.get::<_, u32>(0),
        )
        .optional()?;
    Ok(remaining)
}

pub fn set_low_stock_alerted(
    conn: &Connection,
    prescription_id: &Uuid,
    position: usize,
    alerted: bool,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE prescription_medicines SET low_stock_alerted = ?1
         WHERE prescription_id = ?2 AND position = ?3",
        params![alerted as i32, prescription_id.to_string(), position as i64],
    )?;
    Ok(())
}

struct PrescriptionRow {
    id: String,
    patient_id: String,
    patient_name: String,
    doctor_id: String,
    doctor_name: String,
    start_date: String,
    status: String,
    created_at: String,
}

fn prescription_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<PrescriptionRow, rusqlite::Error> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        doctor_id: row.get(3)?,
        doctor_name: row.get(4)?,
        start_date: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn prescription_from_row(
    row: PrescriptionRow,
    medicines: Vec<Medicine>,
) -> Result<Prescription, DatabaseError> {
    Ok(Prescription {
        id: uuid_from_db("prescriptions.id", &row.id)?,
        patient_id: uuid_from_db("prescriptions.patient_id", &row.patient_id)?,
        patient_name: row.patient_name,
        doctor_id: uuid_from_db("prescriptions.doctor_id", &row.doctor_id)?,
        doctor_name: row.doctor_name,
        start_date: date_from_db("prescriptions.start_date", &row.start_date)?,
        status: PrescriptionStatus::from_str(&row.status)?,
        medicines,
        created_at: timestamp_from_db("prescriptions.created_at", &row.created_at)?,
    })
}
