use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::booking::{hhmm, HHMM_FORMAT};

pub const KEY_WORKING_DAYS: &str = "working_days";
pub const KEY_OPENING_TIME: &str = "opening_time";
pub const KEY_CLOSING_TIME: &str = "closing_time";
pub const KEY_LUNCH_START: &str = "lunch_start";
pub const KEY_LUNCH_END: &str = "lunch_end";
pub const KEY_SLOT_INTERVAL: &str = "slot_interval";
pub const KEY_DEFAULT_DURATION: &str = "default_duration";
pub const KEY_HOLIDAYS: &str = "holidays";

const MINUTES_PER_DAY: u32 = 24 * 60;

pub const SETTING_KEYS: [&str; 8] = [
    KEY_WORKING_DAYS,
    KEY_OPENING_TIME,
    KEY_CLOSING_TIME,
    KEY_LUNCH_START,
    KEY_LUNCH_END,
    KEY_SLOT_INTERVAL,
    KEY_DEFAULT_DURATION,
    KEY_HOLIDAYS,
];

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunchBreak {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

/// Opening hours of the shop. Loaded once from the settings table and shared
/// read-only between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessHours {
    /// Weekdays the shop opens, 0 = Sunday.
    pub working_days: Vec<u32>,
    #[serde(with = "hhmm")]
    pub opening: NaiveTime,
    #[serde(with = "hhmm")]
    pub closing: NaiveTime,
    pub lunch: Option<LunchBreak>,
    pub slot_interval_minutes: u32,
    /// Duration used for slot queries that name no service.
    pub default_duration_minutes: u32,
    pub holidays: Vec<NaiveDate>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            working_days: vec![1, 2, 3, 4, 5, 6],
            opening: hm(9, 0),
            closing: hm(19, 0),
            lunch: Some(LunchBreak {
                start: hm(12, 0),
                end: hm(13, 0),
            }),
            slot_interval_minutes: 30,
            default_duration_minutes: 30,
            holidays: vec![],
        }
    }
}

impl BusinessHours {
    /// Builds the hours from JSON-encoded setting values. Keys the lookup does
    /// not know keep their default.
    pub fn from_settings<F>(mut lookup: F) -> Result<Self, AppError>
    where
        F: FnMut(&str) -> Result<Option<String>, AppError>,
    {
        let mut hours = BusinessHours::default();

        if let Some(raw) = lookup(KEY_WORKING_DAYS)? {
            hours.working_days = parse_json(KEY_WORKING_DAYS, &raw)?;
        }
        if let Some(raw) = lookup(KEY_OPENING_TIME)? {
            let value: String = parse_json(KEY_OPENING_TIME, &raw)?;
            hours.opening = parse_time(&value)?;
        }
        if let Some(raw) = lookup(KEY_CLOSING_TIME)? {
            let value: String = parse_json(KEY_CLOSING_TIME, &raw)?;
            hours.closing = parse_time(&value)?;
        }

        let lunch_start = match lookup(KEY_LUNCH_START)? {
            Some(raw) => parse_json::<Option<String>>(KEY_LUNCH_START, &raw)?,
            None => hours.lunch.map(|l| l.start.format("%H:%M").to_string()),
        };
        let lunch_end = match lookup(KEY_LUNCH_END)? {
            Some(raw) => parse_json::<Option<String>>(KEY_LUNCH_END, &raw)?,
            None => hours.lunch.map(|l| l.end.format("%H:%M").to_string()),
        };
        hours.lunch = match (lunch_start, lunch_end) {
            (Some(start), Some(end)) => Some(LunchBreak {
                start: parse_time(&start)?,
                end: parse_time(&end)?,
            }),
            _ => None,
        };

        if let Some(raw) = lookup(KEY_SLOT_INTERVAL)? {
            hours.slot_interval_minutes = parse_json(KEY_SLOT_INTERVAL, &raw)?;
        }
        if let Some(raw) = lookup(KEY_DEFAULT_DURATION)? {
            hours.default_duration_minutes = parse_json(KEY_DEFAULT_DURATION, &raw)?;
        }
        if let Some(raw) = lookup(KEY_HOLIDAYS)? {
            hours.holidays = parse_json(KEY_HOLIDAYS, &raw)?;
        }

        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(day) = self.working_days.iter().find(|d| **d > 6) {
            return Err(AppError::Config(format!("invalid weekday: {day}")));
        }
        if !(1..=MINUTES_PER_DAY).contains(&self.slot_interval_minutes) {
            return Err(AppError::Config(format!(
                "slot interval must be between 1 and {MINUTES_PER_DAY} minutes"
            )));
        }
        if !(1..=MINUTES_PER_DAY).contains(&self.default_duration_minutes) {
            return Err(AppError::Config(format!(
                "default duration must be between 1 and {MINUTES_PER_DAY} minutes"
            )));
        }
        if self.opening >= self.closing {
            return Err(AppError::Config(format!(
                "opening {} must be before closing {}",
                self.opening.format("%H:%M"),
                self.closing.format("%H:%M")
            )));
        }
        if let Some(lunch) = self.lunch {
            if !(self.opening < lunch.start && lunch.start < lunch.end && lunch.end < self.closing) {
                return Err(AppError::Config(format!(
                    "lunch break {}-{} must lie strictly inside opening hours",
                    lunch.start.format("%H:%M"),
                    lunch.end.format("%H:%M")
                )));
            }
        }
        Ok(())
    }

    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_sunday();
        self.working_days.contains(&weekday) && !self.holidays.contains(&date)
    }

    pub fn to_human_readable(&self) -> String {
        let mut days = self.working_days.clone();
        days.sort_unstable();
        days.dedup();

        let day_list = days
            .iter()
            .filter_map(|d| DAY_NAMES.get(*d as usize).copied())
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = format!(
            "{day_list}: {}-{}",
            self.opening.format("%H:%M"),
            self.closing.format("%H:%M")
        );
        if let Some(lunch) = self.lunch {
            out.push_str(&format!(
                " (closed {}-{})",
                lunch.start.format("%H:%M"),
                lunch.end.format("%H:%M")
            ));
        }
        out
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn parse_json<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError::Config(format!("invalid value for {key}: {e}")))
}

/// Parses `HH:MM`, the same format bookings are stored and serialized with.
pub fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s.trim(), HHMM_FORMAT)
        .map_err(|e| AppError::Config(format!("invalid time '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<BusinessHours, AppError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BusinessHours::from_settings(|key| Ok(map.get(key).cloned()))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_defaults_when_no_settings() {
        let hours = from_map(&[]).unwrap();
        assert_eq!(hours, BusinessHours::default());
    }

    #[test]
    fn test_parse_full_settings() {
        let hours = from_map(&[
            ("working_days", "[1,2,3,4,5]"),
            ("opening_time", "\"08:00\""),
            ("closing_time", "\"18:00\""),
            ("lunch_start", "\"11:30\""),
            ("lunch_end", "\"12:30\""),
            ("slot_interval", "15"),
            ("default_duration", "45"),
            ("holidays", "[\"2025-12-25\"]"),
        ])
        .unwrap();

        assert_eq!(hours.working_days, vec![1, 2, 3, 4, 5]);
        assert_eq!(hours.opening, hm(8, 0));
        assert_eq!(hours.closing, hm(18, 0));
        assert_eq!(hours.lunch.unwrap().start, hm(11, 30));
        assert_eq!(hours.slot_interval_minutes, 15);
        assert_eq!(hours.default_duration_minutes, 45);
        assert_eq!(hours.holidays, vec![date("2025-12-25")]);
    }

    #[test]
    fn test_null_lunch_disables_break() {
        let hours = from_map(&[("lunch_start", "null")]).unwrap();
        assert!(hours.lunch.is_none());
    }

    #[test]
    fn test_lunch_outside_hours_rejected() {
        let err = from_map(&[("lunch_start", "\"08:00\"")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_lunch_inverted_rejected() {
        assert!(from_map(&[("lunch_start", "\"13:00\""), ("lunch_end", "\"12:00\"")]).is_err());
    }

    #[test]
    fn test_closing_before_opening_rejected() {
        assert!(from_map(&[("opening_time", "\"19:00\""), ("closing_time", "\"09:00\"")]).is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(from_map(&[("slot_interval", "0")]).is_err());
    }

    #[test]
    fn test_oversized_durations_rejected() {
        assert!(from_map(&[("default_duration", "4294967295")]).is_err());
        assert!(from_map(&[("default_duration", "1441")]).is_err());
        assert!(from_map(&[("slot_interval", "100000")]).is_err());
        assert!(from_map(&[("default_duration", "1440")]).is_ok());
    }

    #[test]
    fn test_invalid_weekday_rejected() {
        assert!(from_map(&[("working_days", "[1,7]")]).is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(from_map(&[("working_days", "mon,tue")]).is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("09:30").unwrap(), hm(9, 30));
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("12:60").is_err());
        assert!(parse_time("0930").is_err());
        assert!(parse_time("10h00").is_err());
        assert!(parse_time("").is_err());
    }

    #[test]
    fn test_parse_time_matches_serialized_form() {
        #[derive(serde::Deserialize)]
        struct Wrapped {
            #[serde(with = "crate::models::booking::hhmm")]
            at: NaiveTime,
        }

        for raw in ["09:00", "13:30", "18:45"] {
            let wrapped: Wrapped =
                serde_json::from_str(&format!("{{\"at\": \"{raw}\"}}")).unwrap();
            assert_eq!(parse_time(raw).unwrap(), wrapped.at);
        }
    }

    #[test]
    fn test_is_open_on() {
        let mut hours = BusinessHours::default();
        hours.holidays = vec![date("2025-06-17")];
        // 2025-06-16 is a Monday, 2025-06-15 a Sunday
        assert!(hours.is_open_on(date("2025-06-16")));
        assert!(!hours.is_open_on(date("2025-06-15")));
        assert!(!hours.is_open_on(date("2025-06-17")));
    }

    #[test]
    fn test_to_human_readable() {
        let hours = BusinessHours::default();
        assert_eq!(
            hours.to_human_readable(),
            "Mon, Tue, Wed, Thu, Fri, Sat: 09:00-19:00 (closed 12:00-13:00)"
        );
    }
}
