use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{timestamp_from_db, timestamp_to_db, uuid_from_db};
use crate::db::DatabaseError;
use crate::models::*;
use crate::scheduling::AvailabilityTemplate;

pub fn insert_user(
    conn: &Connection,
    user: &User,
    password_hash: &str,
    password_salt: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, email, role, password_hash, password_salt, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.role.as_str(),
            password_hash,
            password_salt,
            timestamp_to_db(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        params![email],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

pub fn get_credential_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<StoredCredential>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, role, created_at, password_hash, password_salt
             FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok((
                    user_row_from_rusqlite(row)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((user_row, password_hash, password_salt)) => Ok(Some(StoredCredential {
            user: user_from_row(user_row)?,
            password_hash,
            password_salt,
        })),
        None => Ok(None),
    }
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, role, created_at FROM users WHERE id = ?1",
            params![id.to_string()],
            user_row_from_rusqlite,
        )
        .optional()?;
    row.map(user_from_row).transpose()
}

/// Same as `get_user` but a missing row is an error.
pub fn require_user(conn: &Connection, id: &Uuid) -> Result<User, DatabaseError> {
    get_user(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "User".into(),
        id: id.to_string(),
    })
}

/// Users holding a role, sorted by name (doctor and patient pickers).
pub fn list_users_by_role(
    conn: &Connection,
    role: Role,
) -> Result<Vec<UserSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM users WHERE role = ?1 ORDER BY name COLLATE NOCASE, id",
    )?;
    let rows = stmt.query_map(params![role.as_str()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut users = Vec::new();
    for row in rows {
        let (id, name) = row?;
        users.push(UserSummary {
            id: uuid_from_db("users.id", &id)?,
            name,
        });
    }
    Ok(users)
}

pub fn set_availability(
    conn: &Connection,
    doctor_id: &Uuid,
    template: &AvailabilityTemplate,
) -> Result<(), DatabaseError> {
    let json = serde_json::to_string(template).map_err(|e| DatabaseError::Corrupt {
        column: "users.availability",
        reason: e.to_string(),
    })?;
    let updated = conn.execute(
        "UPDATE users SET availability = ?1 WHERE id = ?2 AND role = 'doctor'",
        params![json, doctor_id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: doctor_id.to_string(),
        });
    }
    Ok(())
}

/// `Ok(None)` when the doctor exists but never saved a template.
pub fn get_availability(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Option<AvailabilityTemplate>, DatabaseError> {
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT availability FROM users WHERE id = ?1 AND role = 'doctor'",
            params![doctor_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    let Some(raw) = raw else {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: doctor_id.to_string(),
        });
    };

    raw.map(|json| {
        serde_json::from_str(&json).map_err(|e| DatabaseError::Corrupt {
            column: "users.availability",
            reason: e.to_string(),
        })
    })
    .transpose()
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    role: String,
    created_at: String,
}

fn user_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: uuid_from_db("users.id", &row.id)?,
        name: row.name,
        email: row.email,
        role: Role::from_str(&row.role)?,
        created_at: timestamp_from_db("users.created_at", &row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_get_user() {
        let conn = open_memory_database().unwrap();
        let user = fixtures::user(&conn, "Ana", Role::Patient);
        let loaded = get_user(&conn, &user.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Ana");
        assert_eq!(loaded.role, Role::Patient);
    }

    #[test]
    fn duplicate_email_is_constraint_violation() {
        let conn = open_memory_database().unwrap();
        let user = fixtures::user(&conn, "Ana", Role::Patient);
        let copy = User { id: Uuid::new_v4(), ..user };
        let err = insert_user(&conn, &copy, "h", "s").unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn credential_lookup_by_email() {
        let conn = open_memory_database().unwrap();
        fixtures::user(&conn, "Dr Lee", Role::Doctor);
        let cred = get_credential_by_email(&conn, "dr.lee@example.com").unwrap().unwrap();
        assert_eq!(cred.password_hash, "hash");
        assert!(get_credential_by_email(&conn, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn list_by_role_filters_and_sorts() {
        let conn = open_memory_database().unwrap();
        fixtures::user(&conn, "Zed", Role::Doctor);
        fixtures::user(&conn, "amy", Role::Doctor);
        fixtures::user(&conn, "Pat", Role::Patient);
        let doctors = list_users_by_role(&conn, Role::Doctor).unwrap();
        let names: Vec<_> = doctors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["amy", "Zed"]);
    }

    #[test]
    fn availability_round_trip() {
        let conn = open_memory_database().unwrap();
        let doctor = fixtures::user(&conn, "Dr Lee", Role::Doctor);
        assert!(get_availability(&conn, &doctor.id).unwrap().is_none());

        let template =
            AvailabilityTemplate::from_pairs([("Monday", vec!["10:00", "09:00"])]).unwrap();
        set_availability(&conn, &doctor.id, &template).unwrap();
        let loaded = get_availability(&conn, &doctor.id).unwrap().unwrap();
        assert_eq!(loaded, template);
    }

    #[test]
    fn availability_only_for_doctors() {
        let conn = open_memory_database().unwrap();
        let patient = fixtures::user(&conn, "Pat", Role::Patient);
        let template = AvailabilityTemplate::default();
        assert!(matches!(
            set_availability(&conn, &patient.id, &template),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            get_availability(&conn, &patient.id),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
