//! Weekly availability template: weekday -> ordered, de-duplicated times.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const TIME_FORMAT: &str = "%H:%M";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown weekday: {0}")]
    UnknownWeekday(String),

    #[error("Invalid time '{value}' for {weekday} (expected HH:MM)")]
    InvalidTime { weekday: String, value: String },
}

/// English name of a weekday ("Monday").
pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAY_NAMES[day.num_days_from_monday() as usize]
}

/// On the wire this is `{"Monday": ["09:00", "10:00"], ...}`. Parsing
/// validates names and times, sorts and de-duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct AvailabilityTemplate {
    // keyed by days from Monday
    days: BTreeMap<u32, Vec<NaiveTime>>,
}

impl AvailabilityTemplate {
    /// Build from (weekday name, times) pairs.
    pub fn from_pairs<'a, I, T>(pairs: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (&'a str, T)>,
        T: IntoIterator<Item = &'a str>,
    {
        let mut days: BTreeMap<u32, Vec<NaiveTime>> = BTreeMap::new();
        for (name, times) in pairs {
            let weekday: Weekday = name
                .trim()
                .parse()
                .map_err(|_| TemplateError::UnknownWeekday(name.to_string()))?;
            let entry = days.entry(weekday.num_days_from_monday()).or_default();
            for raw in times {
                let time = NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(|_| {
                    TemplateError::InvalidTime {
                        weekday: weekday_name(weekday).to_string(),
                        value: raw.to_string(),
                    }
                })?;
                entry.push(time);
            }
        }

        for times in days.values_mut() {
            times.sort();
            times.dedup();
        }
        days.retain(|_, times| !times.is_empty());
        Ok(Self { days })
    }

    /// Times offered on a weekday; empty when the day has no entry.
    pub fn times_for(&self, day: Weekday) -> &[NaiveTime] {
        self.days
            .get(&day.num_days_from_monday())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when the instant's weekday lists the instant's time of day.
    pub fn offers(&self, instant: &NaiveDateTime) -> bool {
        self.times_for(instant.weekday())
            .binary_search(&instant.time())
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for AvailabilityTemplate {
    type Error = TemplateError;

    fn try_from(raw: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        Self::from_pairs(
            raw.iter()
                .map(|(day, times)| (day.as_str(), times.iter().map(String::as_str))),
        )
    }
}

impl From<AvailabilityTemplate> for BTreeMap<String, Vec<String>> {
    fn from(template: AvailabilityTemplate) -> Self {
        template
            .days
            .into_iter()
            .map(|(index, times)| {
                (
                    WEEKDAY_NAMES[index as usize].to_string(),
                    times.iter().map(|t| t.format(TIME_FORMAT).to_string()).collect(),
                )
            })
            .collect()
    }
}
