//! Availability-to-slot-grid reconciler.
//!
//! Pure function over the template and the doctor's appointments; the
//! caller supplies `today`/`now` so the grid is deterministic.

use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

use super::template::{weekday_name, AvailabilityTemplate};
use super::PastSlotPolicy;
use crate::models::Appointment;

/// Rolling window length, today inclusive.
pub const GRID_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSlot {
    pub slot_instant: NaiveDateTime,
    pub display_time: String,
    pub is_booked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub weekday: &'static str,
    pub slots: Vec<GridSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatSlot {
    pub date: NaiveDate,
    pub display_time: String,
    pub is_booked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotGrid {
    pub doctor_id: Uuid,
    pub days: Vec<DaySlots>,
}

impl SlotGrid {
    /// Day-then-time ordered sequence of every slot in the window.
    pub fn flatten(&self) -> Vec<FlatSlot> {
        self.days
            .iter()
            .flat_map(|day| {
                day.slots.iter().map(move |slot| FlatSlot {
                    date: day.date,
                    display_time: slot.display_time.clone(),
                    is_booked: slot.is_booked,
                })
            })
            .collect()
    }

    pub fn slot(&self, instant: &NaiveDateTime) -> Option<&GridSlot> {
        self.days
            .iter()
            .find(|day| day.date == instant.date())
            .and_then(|day| day.slots.iter().find(|s| s.slot_instant == *instant))
    }
}

/// Compose the grid for the seven days starting at `today`.
///
/// A slot is booked iff its instant equals the stored instant of a pending
/// or confirmed appointment of `doctor_id`. Other doctors' appointments and
/// rejected ones are ignored.
pub fn build_slot_grid<'a, I>(
    doctor_id: Uuid,
    template: &AvailabilityTemplate,
    appointments: I,
    today: NaiveDate,
    now: NaiveDateTime,
    policy: PastSlotPolicy,
) -> SlotGrid
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let booked: HashSet<NaiveDateTime> = appointments
        .into_iter()
        .filter(|a| a.doctor_id == doctor_id && a.status.is_live())
        .map(|a| a.slot_instant)
        .collect();

    let days = (0..GRID_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .map(|date| {
            let weekday = date.weekday();
            let slots = template
                .times_for(weekday)
                .iter()
                .map(|time| date.and_time(*time))
                .filter(|instant| policy == PastSlotPolicy::Show || *instant >= now)
                .map(|instant| GridSlot {
                    display_time: instant.format("%H:%M").to_string(),
                    is_booked: booked.contains(&instant),
                    slot_instant: instant,
                })
                .collect();
            DaySlots {
                date,
                weekday: weekday_name(weekday),
                slots,
            }
        })
        .collect();

    SlotGrid { doctor_id, days }
}
