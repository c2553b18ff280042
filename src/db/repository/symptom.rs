use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{timestamp_from_db, timestamp_to_db, uuid_from_db};
use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_exchange(conn: &Connection, exchange: &SymptomExchange) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO symptom_exchanges
             (id, user_id, conversation_id, user_message, ai_response, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            exchange.id.to_string(),
            exchange.user_id.to_string(),
            exchange.conversation_id.to_string(),
            exchange.user_message,
            exchange.ai_response,
            timestamp_to_db(&exchange.created_at),
        ],
    )?;
    Ok(())
}

/// The user's most recent exchanges, newest first.
pub fn get_recent_exchanges(
    conn: &Connection,
    user_id: &Uuid,
    limit: u32,
) -> Result<Vec<SymptomExchange>, DatabaseError> {
    query_exchanges(
        conn,
        "WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        params![user_id.to_string(), limit],
    )
}

/// One conversation of a user, oldest first.
pub fn get_conversation_exchanges(
    conn: &Connection,
    user_id: &Uuid,
    conversation_id: &Uuid,
) -> Result<Vec<SymptomExchange>, DatabaseError> {
    query_exchanges(
        conn,
        "WHERE user_id = ?1 AND conversation_id = ?2 ORDER BY created_at, rowid",
        params![user_id.to_string(), conversation_id.to_string()],
    )
}

fn query_exchanges(
    conn: &Connection,
    clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<SymptomExchange>, DatabaseError> {
    let sql = format!(
        "SELECT id, user_id, conversation_id, user_message, ai_response, created_at
         FROM symptom_exchanges {clause}"
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
        ))
    })?;

    let mut exchanges = Vec::new();
    for row in rows {
        let (id, user_id, conversation_id, user_message, ai_response, created_at) = row?;
        exchanges.push(SymptomExchange {
            id: uuid_from_db("symptom_exchanges.id", &id)?,
            user_id: uuid_from_db("symptom_exchanges.user_id", &user_id)?,
            conversation_id: uuid_from_db("symptom_exchanges.conversation_id", &conversation_id)?,
            user_message,
            ai_response,
            created_at: timestamp_from_db("symptom_exchanges.created_at", &created_at)?,
        });
    }
    Ok(exchanges)
}
