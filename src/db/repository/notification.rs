use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{timestamp_from_db, timestamp_to_db, uuid_from_db};
use crate::db::DatabaseError;
use crate::models::*;

const NOTIFICATION_COLUMNS: &str = "id, target_user_id, target_role, kind, message, patient_id,
     patient_name, medicine_name, is_read, created_at";

pub fn insert_notification(conn: &Connection, n: &Notification) -> Result<(), DatabaseError> {
    let (target_user_id, target_role) = match n.target {
        NotificationTarget::User(id) => (Some(id.to_string()), None),
        NotificationTarget::Role(role) => (None, Some(role.as_str())),
    };
    conn.execute(
        "INSERT INTO notifications (id, target_user_id, target_role, kind, message, patient_id,
         patient_name, medicine_name, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            n.id.to_string(),
            target_user_id,
            target_role,
            n.kind.as_str(),
            n.message,
            n.patient_id.map(|id| id.to_string()),
            n.patient_name,
            n.medicine_name,
            n.is_read as i32,
            timestamp_to_db(&n.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_notification(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Notification>, DatabaseError> {
    let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], notification_row_from_rusqlite)
        .optional()?;
    row.map(notification_from_row).transpose()
}

/// Unread notifications addressed to a role, newest first.
pub fn get_unread_for_role(
    conn: &Connection,
    role: Role,
) -> Result<Vec<Notification>, DatabaseError> {
    query_notifications(
        conn,
        "WHERE target_role = ?1 AND is_read = 0 ORDER BY created_at DESC, rowid DESC",
        params![role.as_str()],
    )
}

/// Everything addressed to one user, newest first.
pub fn get_for_user(conn: &Connection, user_id: &Uuid) -> Result<Vec<Notification>, DatabaseError> {
    query_notifications(
        conn,
        "WHERE target_user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        params![user_id.to_string()],
    )
}

pub fn mark_notification_read(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(updated == 1)
}

fn query_notifications(
    conn: &Connection,
    clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Notification>, DatabaseError> {
    let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications {clause}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, notification_row_from_rusqlite)?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(notification_from_row(row?)?);
    }
    Ok(notifications)
}

struct NotificationRow {
    id: String,
    target_user_id: Option<String>,
    target_role: Option<String>,
    kind: String,
    message: String,
    patient_id: Option<String>,
    patient_name: Option<String>,
    medicine_name: Option<String>,
    is_read: i32,
    created_at: String,
}

fn notification_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<NotificationRow, rusqlite::Error> {
    Ok(NotificationRow {
        id: row.get(0)?,
        target_user_id: row.get(1)?,
        target_role: row.get(2)?,
        kind: row.get(3)?,
        message: row.get(4)?,
        patient_id: row.get(5)?,
        patient_name: row.get(6)?,
        medicine_name: row.get(7)?,
        is_read: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn notification_from_row(row: NotificationRow) -> Result<Notification, DatabaseError> {
    let target = match (row.target_user_id, row.target_role) {
        (Some(user), None) => {
            NotificationTarget::User(uuid_from_db("notifications.target_user_id", &user)?)
        }
        (None, Some(role)) => NotificationTarget::Role(Role::from_str(&role)?),
        _ => {
            return Err(DatabaseError::Corrupt {
                column: "notifications.target",
                reason: "exactly one of user or role must be set".into(),
            })
        }
    };
    Ok(Notification {
        id: uuid_from_db("notifications.id", &row.id)?,
        target,
        kind: NotificationKind::from_str(&row.kind)?,
        message: row.message,
        patient_id: row
            .patient_id
            .map(|s| uuid_from_db("notifications.patient_id", &s))
            .transpose()?,
        patient_name: row.patient_name,
        medicine_name: row.medicine_name,
        is_read: row.is_read != 0,
        created_at: timestamp_from_db("notifications.created_at", &row.created_at)?,
    })
}
