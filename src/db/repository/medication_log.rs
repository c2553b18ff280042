use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{date_from_db, timestamp_from_db, timestamp_to_db, uuid_from_db};
use crate::db::DatabaseError;
use crate::models::*;

/// Append a dose to the log. Logging the same dose twice on one date fails
/// with a constraint violation.
pub fn insert_log_entry(
    conn: &Connection,
    entry: &MedicationLogEntry,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medication_log (id, patient_id, prescription_id, medicine_name, dose_time,
         date_taken, taken_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id.to_string(),
            entry.patient_id.to_string(),
            entry.prescription_id.to_string(),
            entry.medicine_name,
            entry.dose_time.as_str(),
            entry.date_taken.to_string(),
            timestamp_to_db(&entry.taken_at),
        ],
    )?;
    Ok(())
}

pub fn get_log_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicationLogEntry>, DatabaseError> {
    query_log(
        conn,
        "WHERE patient_id = ?1 ORDER BY date_taken, taken_at",
        params![patient_id.to_string()],
    )
}

pub fn get_log_for_patient_on(
    conn: &Connection,
    patient_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<MedicationLogEntry>, DatabaseError> {
    query_log(
        conn,
        "WHERE patient_id = ?1 AND date_taken = ?2 ORDER BY taken_at",
        params![patient_id.to_string(), date.to_string()],
    )
}

pub fn count_log_entries(conn: &Connection, patient_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM medication_log WHERE patient_id = ?1",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn query_log(
    conn: &Connection,
    clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<MedicationLogEntry>, DatabaseError> {
    let sql = format!(
        "SELECT id, patient_id, prescription_id, medicine_name, dose_time, date_taken, taken_at
         FROM medication_log {clause}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, patient_id, prescription_id, medicine_name, dose_time, date_taken, taken_at) =
            row?;
        entries.push(MedicationLogEntry {
            id: uuid_from_db("medication_log.id", &id)?,
            patient_id: uuid_from_db("medication_log.patient_id", &patient_id)?,
            prescription_id: uuid_from_db("medication_log.prescription_id", &prescription_id)?,
            medicine_name,
            dose_time: DoseTime::from_str(&dose_time)?,
            date_taken: date_from_db("medication_log.date_taken", &date_taken)?,
            taken_at: timestamp_from_db("medication_log.taken_at", &taken_at)?,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::{self, medicine, prescription};
    use crate::db::sqlite::open_memory_database;
    use chrono::Utc;

    #[test]
    fn same_dose_same_day_is_logged_once() {
        let conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let patient = fixtures::user(&conn, "Ana", Role::Patient);
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let rx = prescription(
            &conn,
            &patient,
            &doctor,
            today,
            vec![medicine("Zinc", 3, DoseSchedule { morning: true, ..Default::default() }, 9)],
        );

        let entry = MedicationLogEntry {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            prescription_id: rx.id,
            medicine_name: "Zinc".into(),
            dose_time: DoseTime::Morning,
            date_taken: today,
            taken_at: Utc::now(),
        };
        insert_log_entry(&conn, &entry).unwrap();
        let dup = MedicationLogEntry { id: Uuid::new_v4(), ..entry.clone() };
        assert!(insert_log_entry(&conn, &dup).unwrap_err().is_constraint_violation());

        let next_day = MedicationLogEntry {
            id: Uuid::new_v4(),
            date_taken: today.succ_opt().unwrap(),
            ..entry
        };
        insert_log_entry(&conn, &next_day).unwrap();

        assert_eq!(get_log_for_patient(&conn, &patient.id).unwrap().len(), 2);
        assert_eq!(get_log_for_patient_on(&conn, &patient.id, today).unwrap().len(), 1);
        assert_eq!(count_log_entries(&conn, &patient.id).unwrap(), 2);
    }
}
