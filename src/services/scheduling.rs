use chrono::{NaiveDate, NaiveTime};

use crate::models::{minutes_of_day, Booking, BusinessHours};
use crate::services::clock::Clock;

/// Reason a start time cannot take a new appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotConflict {
    Closed,
    OffGrid,
    PastClosing,
    LunchBreak,
    Booked,
}

impl std::fmt::Display for SlotConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotConflict::Closed => write!(f, "the shop is closed on that day"),
            SlotConflict::OffGrid => write!(f, "that is not one of the offered start times"),
            SlotConflict::PastClosing => write!(f, "the service would end after closing time"),
            SlotConflict::LunchBreak => write!(f, "the service would overlap the lunch break"),
            SlotConflict::Booked => write!(f, "that time is already booked"),
        }
    }
}

fn time_from_minutes(minutes: i64) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, 0)
}

/// Half-open interval overlap: `[a1, a2)` and `[b1, b2)` overlap iff
/// `a1 < b2 && a2 > b1`. Touching endpoints do not overlap.
pub fn overlaps(a: (i64, i64), b: (i64, i64)) -> bool {
    a.0 < b.1 && a.1 > b.0
}

/// Start times on `date` where an appointment of `duration_minutes` fits
/// without running past closing, into lunch, or into a confirmed booking.
/// Past dates and closed days yield nothing.
pub fn available_slots(
    date: NaiveDate,
    duration_minutes: i32,
    hours: &BusinessHours,
    bookings: &[Booking],
    clock: &dyn Clock,
) -> Vec<NaiveTime> {
    if date < clock.today() || !hours.is_open_on(date) || duration_minutes <= 0 {
        return vec![];
    }

    let opening = minutes_of_day(hours.opening);
    let closing = minutes_of_day(hours.closing);
    let step = hours.slot_interval_minutes.max(1) as i64;

    let mut slots = vec![];
    let mut start = opening;
    while start < closing {
        if fits(start, duration_minutes, hours, bookings).is_ok() {
            if let Some(t) = time_from_minutes(start) {
                slots.push(t);
            }
        }
        start += step;
    }
    slots
}

/// Checks one candidate start time against the same rules `available_slots`
/// applies, including grid alignment. The date itself is not compared to today.
pub fn check_slot(
    date: NaiveDate,
    start: NaiveTime,
    duration_minutes: i32,
    hours: &BusinessHours,
    bookings: &[Booking],
) -> Result<(), SlotConflict> {
    if !hours.is_open_on(date) {
        return Err(SlotConflict::Closed);
    }

    let start = minutes_of_day(start);
    let opening = minutes_of_day(hours.opening);
    let step = hours.slot_interval_minutes.max(1) as i64;
    if start < opening || start >= minutes_of_day(hours.closing) || (start - opening) % step != 0 {
        return Err(SlotConflict::OffGrid);
    }

    fits(start, duration_minutes, hours, bookings)
}

fn fits(
    start: i64,
    duration_minutes: i32,
    hours: &BusinessHours,
    bookings: &[Booking],
) -> Result<(), SlotConflict> {
    let end = start + duration_minutes.max(1) as i64;
    let candidate = (start, end);

    if end > minutes_of_day(hours.closing) {
        return Err(SlotConflict::PastClosing);
    }

    if let Some(lunch) = hours.lunch {
        let lunch = (minutes_of_day(lunch.start), minutes_of_day(lunch.end));
        if overlaps(candidate, lunch) {
            return Err(SlotConflict::LunchBreak);
        }
    }

    if bookings
        .iter()
        .filter(|b| b.is_confirmed())
        .any(|b| overlaps(candidate, b.interval()))
    {
        return Err(SlotConflict::Booked);
    }

    Ok(())
}
