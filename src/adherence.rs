//! Adherence expander: per-date taken/missed/pending breakdown of every
//! scheduled dose, plus a score over past dates.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Taken,
    Missed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoseEntry {
    pub prescription_id: Uuid,
    pub medicine_name: String,
    pub dose_time: DoseTime,
    pub status: DoseStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdherenceDay {
    pub date: NaiveDate,
    pub doses: Vec<DoseEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdherenceReport {
    /// Latest date first.
    pub days: Vec<AdherenceDay>,
    pub taken: u32,
    pub missed: u32,
    pub pending: u32,
    /// Percentage of past doses taken; 100 when there are none.
    pub score: u32,
}

impl AdherenceReport {
    pub fn day(&self, date: NaiveDate) -> Option<&AdherenceDay> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// Expand each medicine's course into dated doses and classify them.
///
/// `taken` and `missed` only count dates before `today`; doses on or after
/// `today` are pending unless already logged. Comparison is by calendar
/// date.
pub fn expand_adherence(
    prescriptions: &[Prescription],
    log: &[MedicationLogEntry],
    today: NaiveDate,
) -> AdherenceReport {
    let taken_keys: HashSet<(NaiveDate, &str, DoseTime)> = log
        .iter()
        .map(|e| (e.date_taken, e.medicine_name.as_str(), e.dose_time))
        .collect();

    let mut by_date: BTreeMap<NaiveDate, Vec<DoseEntry>> = BTreeMap::new();
    let (mut taken, mut missed, mut pending) = (0u32, 0u32, 0u32);

    for rx in prescriptions {
        for med in &rx.medicines {
            for date in med.course_dates(rx.start_date) {
                for dose_time in med.dose.times() {
                    let status = if taken_keys.contains(&(date, med.name.as_str(), dose_time)) {
                        DoseStatus::Taken
                    } else if date < today {
                        DoseStatus::Missed
                    } else {
                        DoseStatus::Pending
                    };

                    match status {
                        DoseStatus::Taken if date < today => taken += 1,
                        DoseStatus::Taken => {}
                        DoseStatus::Missed => missed += 1,
                        DoseStatus::Pending => pending += 1,
                    }

                    by_date.entry(date).or_default().push(DoseEntry {
                        prescription_id: rx.id,
                        medicine_name: med.name.clone(),
                        dose_time,
                        status,
                    });
                }
            }
        }
    }

    AdherenceReport {
        days: by_date
            .into_iter()
            .rev()
            .map(|(date, doses)| AdherenceDay { date, doses })
            .collect(),
        taken,
        missed,
        pending,
        score: adherence_score(taken, missed),
    }
}

/// Rounded percentage; 100 when nothing was due yet.
pub fn adherence_score(taken: u32, missed: u32) -> u32 {
    let due = taken + missed;
    if due == 0 {
        return 100;
    }
    (f64::from(taken) * 100.0 / f64::from(due)).round() as u32
}

pub fn patient_adherence(
    conn: &Connection,
    patient_id: &Uuid,
    today: NaiveDate,
) -> Result<AdherenceReport, DatabaseError> {
    let prescriptions = repository::get_active_prescriptions_for_patient(conn, patient_id)?;
    let log = repository::get_log_for_patient(conn, patient_id)?;
    Ok(expand_adherence(&prescriptions, &log, today))
}
