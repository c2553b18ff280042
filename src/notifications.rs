//! Notification inboxes and pharmacy offers.

use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::*;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    #[error("Please enter an offer message")]
    EmptyMessage,

    #[error("Offers can only answer a low-stock notification")]
    NotLowStock,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for NotificationError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

pub fn offer_message(pharmacy_name: &str, medicine: &str, message: &str) -> String {
    format!("Offer from {pharmacy_name} for {medicine}: {message}")
}

/// Unread low-stock alerts shared by every pharmacy account.
pub fn pharmacy_inbox(conn: &Connection) -> Result<Vec<Notification>, NotificationError> {
    Ok(repository::get_unread_for_role(conn, Role::Pharmacy)?)
}

pub fn user_inbox(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<Notification>, NotificationError> {
    Ok(repository::get_for_user(conn, user_id)?)
}

/// Load a notification the user is allowed to see. Anything else reads as
/// not found.
fn addressed_notification(
    conn: &Connection,
    user: &User,
    id: &Uuid,
) -> Result<Notification, NotificationError> {
    match repository::get_notification(conn, id)? {
        Some(n) if n.is_addressed_to(&user.id, user.role) => Ok(n),
        _ => Err(NotificationError::NotFound(*id)),
    }
}

pub fn mark_read(
    conn: &Connection,
    user: &User,
    id: &Uuid,
) -> Result<Notification, NotificationError> {
    let mut notification = addressed_notification(conn, user, id)?;
    repository::mark_notification_read(conn, id)?;
    notification.is_read = true;
    Ok(notification)
}

/// Answer a low-stock alert with an offer addressed to the patient, and
/// take the alert out of the pharmacy inbox.
pub fn send_offer(
    conn: &mut Connection,
    pharmacy: &User,
    notification_id: &Uuid,
    message: &str,
) -> Result<Notification, NotificationError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(NotificationError::EmptyMessage);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let source = addressed_notification(&tx, pharmacy, notification_id)?;
    let (patient_id, medicine) = match (source.kind, source.patient_id, &source.medicine_name) {
        (NotificationKind::LowStock, Some(patient_id), Some(medicine)) => {
            (patient_id, medicine.clone())
        }
        _ => return Err(NotificationError::NotLowStock),
    };

    let mut offer = Notification::new(
        NotificationTarget::User(patient_id),
        NotificationKind::PharmacyOffer,
        offer_message(&pharmacy.name, &medicine, message),
    );
    offer.patient_id = Some(patient_id);
    offer.patient_name = source.patient_name.clone();
    offer.medicine_name = Some(medicine);

    repository::insert_notification(&tx, &offer)?;
    repository::mark_notification_read(&tx, &source.id)?;
    tx.commit()?;

    tracing::info!(source_id = %source.id, patient_id = %patient_id, "Pharmacy offer sent");
    Ok(offer)
}
