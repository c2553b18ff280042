use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{NotificationKind, Role};

/// A notification is addressed to exactly one user or to a whole role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum NotificationTarget {
    User(Uuid),
    Role(Role),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub target: NotificationTarget,
    pub kind: NotificationKind,
    pub message: String,
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub medicine_name: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(target: NotificationTarget, kind: NotificationKind, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            kind,
            message,
            patient_id: None,
            patient_name: None,
            medicine_name: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_addressed_to(&self, user_id: &Uuid, role: Role) -> bool {
        match self.target {
            NotificationTarget::User(id) => id == *user_id,
            NotificationTarget::Role(r) => r == role,
        }
    }
}
