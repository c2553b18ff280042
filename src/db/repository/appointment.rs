use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{timestamp_from_db, timestamp_to_db, uuid_from_db};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, patient_name, doctor_id, doctor_name,
     slot_instant, status, created_at";

/// Insert a new appointment. A second live appointment for the same
/// (doctor, slot) fails with a constraint violation from the partial
/// unique index.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, patient_name, doctor_id, doctor_name,
         slot_instant, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.patient_name,
            appt.doctor_id.to_string(),
            appt.doctor_name,
            format_slot_instant(&appt.slot_instant),
            appt.status.as_str(),
            timestamp_to_db(&appt.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], appointment_row_from_rusqlite)
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// Pending and confirmed appointments of a doctor (the booked-slot source).
pub fn get_live_appointments_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        "WHERE doctor_id = ?1 AND status IN ('pending', 'confirmed') ORDER BY slot_instant",
        params![doctor_id.to_string()],
    )
}

/// A patient's appointments, latest slot first.
pub fn get_appointments_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        "WHERE patient_id = ?1 ORDER BY slot_instant DESC",
        params![patient_id.to_string()],
    )
}

/// Requests awaiting the doctor's decision, oldest request first.
pub fn get_pending_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        "WHERE doctor_id = ?1 AND status = 'pending' ORDER BY created_at, rowid",
        params![doctor_id.to_string()],
    )
}

/// Confirmed appointments with `from <= slot < until`, earliest first.
pub fn get_confirmed_for_doctor_between(
    conn: &Connection,
    doctor_id: &Uuid,
    from: &NaiveDateTime,
    until: &NaiveDateTime,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(
        conn,
        "WHERE doctor_id = ?1 AND status = 'confirmed'
         AND slot_instant >= ?2 AND slot_instant < ?3 ORDER BY slot_instant",
        params![
            doctor_id.to_string(),
            format_slot_instant(from),
            format_slot_instant(until),
        ],
    )
}

/// Move a pending appointment owned by `doctor_id` to `status`.
/// Returns false when no row matched (unknown, foreign, or already decided).
pub fn update_status_if_pending(
    conn: &Connection,
    id: &Uuid,
    doctor_id: &Uuid,
    status: AppointmentStatus,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1
         WHERE id = ?2 AND doctor_id = ?3 AND status = 'pending'",
        params![status.as_str(), id.to_string(), doctor_id.to_string()],
    )?;
    Ok(updated == 1)
}

fn query_appointments(
    conn: &Connection,
    clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments {clause}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, appointment_row_from_rusqlite)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

struct AppointmentRow {
    id: String,
    patient_id: String,
    patient_name: String,
    doctor_id: String,
    doctor_name: String,
    slot_instant: String,
    status: String,
    created_at: String,
}

fn appointment_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        doctor_id: row.get(3)?,
        doctor_name: row.get(4)?,
        slot_instant: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    let slot_instant = parse_slot_instant(&row.slot_instant).ok_or_else(|| DatabaseError::Corrupt {
        column: "appointments.slot_instant",
        reason: row.slot_instant.clone(),
    })?;
    Ok(Appointment {
        id: uuid_from_db("appointments.id", &row.id)?,
        patient_id: uuid_from_db("appointments.patient_id", &row.patient_id)?,
        patient_name: row.patient_name,
        doctor_id: uuid_from_db("appointments.doctor_id", &row.doctor_id)?,
        doctor_name: row.doctor_name,
        slot_instant,
        status: AppointmentStatus::from_str(&row.status)?,
        created_at: timestamp_from_db("appointments.created_at", &row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;
    use chrono::{Duration, NaiveDate, Utc};

    fn slot(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn appointment(patient: &User, doctor: &User, at: NaiveDateTime) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            patient_name: patient.name.clone(),
            doctor_id: doctor.id,
            doctor_name: doctor.name.clone(),
            slot_instant: at,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn second_live_booking_for_same_slot_is_rejected() {
        let conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let a = fixtures::user(&conn, "Ana", Role::Patient);
        let b = fixtures::user(&conn, "Ben", Role::Patient);

        insert_appointment(&conn, &appointment(&a, &doctor, slot(19, 9))).unwrap();
        let err = insert_appointment(&conn, &appointment(&b, &doctor, slot(19, 9))).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn rejected_appointment_frees_the_slot() {
        let conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let a = fixtures::user(&conn, "Ana", Role::Patient);
        let b = fixtures::user(&conn, "Ben", Role::Patient);

        let first = appointment(&a, &doctor, slot(19, 9));
        insert_appointment(&conn, &first).unwrap();
        assert_eq!(get_live_appointments_for_doctor(&conn, &doctor.id).unwrap().len(), 1);

        let rejected = AppointmentStatus::Rejected;
        assert!(update_status_if_pending(&conn, &first.id, &doctor.id, rejected).unwrap());
        assert!(get_live_appointments_for_doctor(&conn, &doctor.id).unwrap().is_empty());
        insert_appointment(&conn, &appointment(&b, &doctor, slot(19, 9))).unwrap();
    }

    #[test]
    fn status_update_requires_pending_and_owner() {
        let conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let other = fixtures::user(&conn, "Dr Kim", Role::Doctor);
        let a = fixtures::user(&conn, "Ana", Role::Patient);

        let appt = appointment(&a, &doctor, slot(20, 10));
        insert_appointment(&conn, &appt).unwrap();

        let confirmed = AppointmentStatus::Confirmed;
        let rejected = AppointmentStatus::Rejected;
        assert!(!update_status_if_pending(&conn, &appt.id, &other.id, confirmed).unwrap());
        assert!(update_status_if_pending(&conn, &appt.id, &doctor.id, confirmed).unwrap());
        assert!(!update_status_if_pending(&conn, &appt.id, &doctor.id, rejected).unwrap());

        let loaded = get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(loaded.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn views_are_ordered() {
        let conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let a = fixtures::user(&conn, "Ana", Role::Patient);

        let mut first = appointment(&a, &doctor, slot(22, 9));
        first.created_at = Utc::now() - Duration::minutes(5);
        let second = appointment(&a, &doctor, slot(20, 9));
        insert_appointment(&conn, &first).unwrap();
        insert_appointment(&conn, &second).unwrap();

        let pending = get_pending_for_doctor(&conn, &doctor.id).unwrap();
        assert_eq!(pending[0].id, first.id);

        let mine = get_appointments_for_patient(&conn, &a.id).unwrap();
        assert_eq!(mine[0].slot_instant, slot(22, 9));

        let confirmed = AppointmentStatus::Confirmed;
        update_status_if_pending(&conn, &first.id, &doctor.id, confirmed).unwrap();
        update_status_if_pending(&conn, &second.id, &doctor.id, confirmed).unwrap();
        let (from, to) = (slot(19, 0), slot(21, 0));
        let upcoming = get_confirmed_for_doctor_between(&conn, &doctor.id, &from, &to).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, second.id);
    }
}
