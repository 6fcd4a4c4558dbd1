use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Time-of-day format used on the wire, in settings and in the store.
pub const HHMM_FORMAT: &str = "%H:%M";

pub fn minutes_of_day(t: NaiveTime) -> i64 {
    (t.num_seconds_from_midnight() / 60) as i64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub confirmation_code: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub service_code: String,
    pub service_name: String,
    pub price: f64,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Copied from the service when the booking is admitted.
    pub duration_minutes: i32,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancellation_reason: Option<String>,
}

impl Booking {
    /// Half-open `[start, end)` interval in minutes since midnight.
    pub fn interval(&self) -> (i64, i64) {
        let start = minutes_of_day(self.start_time);
        (start, start + self.duration_minutes as i64)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// Fields supplied to `insert_booking`; id and status are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub confirmation_code: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub service_code: String,
    pub service_name: String,
    pub price: f64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Serializes a `NaiveTime` as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::HHMM_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(HHMM_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, HHMM_FORMAT).map_err(serde::de::Error::custom)
    }
}
