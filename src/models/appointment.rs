use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

/// Canonical text form of a slot instant. Booked-slot membership is an
/// exact string match on this form, so it must never vary.
pub const SLOT_INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn format_slot_instant(instant: &NaiveDateTime) -> String {
    instant.format(SLOT_INSTANT_FORMAT).to_string()
}

pub fn parse_slot_instant(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, SLOT_INSTANT_FORMAT).ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub slot_instant: NaiveDateTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn slot_instant_format_is_stable() {
        let instant = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let s = format_slot_instant(&instant);
        assert_eq!(s, "2026-10-19T09:00:00");
        assert_eq!(parse_slot_instant(&s), Some(instant));
    }

    #[test]
    fn parse_rejects_other_forms() {
        assert!(parse_slot_instant("2026-10-19 09:00").is_none());
        assert!(parse_slot_instant("2026-10-19T09:00:00Z").is_none());
    }
}
