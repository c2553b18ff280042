use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DoseTime, PrescriptionStatus};

/// Which times of day a medicine is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseSchedule {
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub noon: bool,
    #[serde(default)]
    pub night: bool,
}

impl DoseSchedule {
    pub fn includes(&self, time: DoseTime) -> bool {
        match time {
            DoseTime::Morning => self.morning,
            DoseTime::Noon => self.noon,
            DoseTime::Night => self.night,
        }
    }

    /// Flagged dose times in display order.
    pub fn times(&self) -> impl Iterator<Item = DoseTime> + '_ {
        DoseTime::ALL.into_iter().filter(|t| self.includes(*t))
    }

    pub fn is_empty(&self) -> bool {
        !(self.morning || self.noon || self.night)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
    pub total_days: u32,
    pub dose: DoseSchedule,
    pub stock_count: u32,
    pub remaining_count: u32,
    #[serde(default)]
    pub low_stock_alerted: bool,
}

impl Medicine {
    /// Calendar dates of the course: `start` inclusive, `total_days` long.
    pub fn course_dates(&self, start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        (0..u64::from(self.total_days))
            .filter_map(move |offset| start.checked_add_days(Days::new(offset)))
    }

    pub fn covers(&self, start: NaiveDate, date: NaiveDate) -> bool {
        if date < start {
            return false;
        }
        let elapsed = (date - start).num_days();
        elapsed < i64::from(self.total_days)
    }

    pub fn has_supply(&self) -> bool {
        self.stock_count > 0 && self.remaining_count > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub start_date: NaiveDate,
    pub status: PrescriptionStatus,
    pub medicines: Vec<Medicine>,
    pub created_at: DateTime<Utc>,
}

/// One dose a patient actually took. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationLogEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub prescription_id: Uuid,
    pub medicine_name: String,
    pub dose_time: DoseTime,
    pub date_taken: NaiveDate,
    pub taken_at: DateTime<Utc>,
}
