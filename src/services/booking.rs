use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::{AppError, BookingError, UniqueKey};
use crate::models::business_hours::parse_time;
use crate::models::{Booking, BookingStatus, BusinessHours, NewBooking};
use crate::services::clock::Clock;
use crate::services::scheduling::check_slot;
use crate::services::validation::{is_valid_name, normalize_phone, parse_date};

pub const CONFIRMATION_PREFIX: &str = "BS";

/// Insert attempts per admission; a confirmation code collision is retried once.
const MAX_CODE_ATTEMPTS: usize = 2;

/// A booking as submitted by a customer. Every field arrives optional so a
/// missing one can be reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub service_code: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub notes: Option<String>,
}

/// Everything admission needs besides the store.
pub struct Admission<'a> {
    pub hours: &'a BusinessHours,
    pub clock: &'a dyn Clock,
    pub phone_country_code: &'a str,
}

/// `BS` + `DDMMYY` + `HHMMSS` + four random characters.
pub fn generate_confirmation_code(now: NaiveDateTime) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{CONFIRMATION_PREFIX}{}{}",
        now.format("%d%m%y%H%M%S"),
        random[..4].to_uppercase()
    )
}

/// Validates `request` and, if the requested start time is still free in the
/// store, persists a confirmed booking.
///
/// The availability re-check and the insert run in one `BEGIN IMMEDIATE`
/// transaction, so concurrent admissions are serialized by SQLite's writer
/// lock; the partial unique index on confirmed `(date, start_time)` backs this up.
pub fn admit(
    conn: &mut Connection,
    ctx: &Admission<'_>,
    request: &BookingRequest,
) -> Result<Booking, BookingError> {
    let now = ctx.clock.now();
    admit_with_codes(conn, ctx, request, || generate_confirmation_code(now))
}

fn admit_with_codes<F>(
    conn: &mut Connection,
    ctx: &Admission<'_>,
    request: &BookingRequest,
    mut next_code: F,
) -> Result<Booking, BookingError>
where
    F: FnMut() -> String,
{
    let name = required(&request.name, "name")?;
    let phone = required(&request.phone, "phone")?;
    let service_code = required(&request.service_code, "service_code")?;
    let date = required(&request.date, "date")?;
    let start_time = required(&request.start_time, "start_time")?;

    if !is_valid_name(name) {
        return Err(BookingError::InvalidName);
    }

    let phone = normalize_phone(phone, ctx.phone_country_code).ok_or(BookingError::InvalidPhone)?;

    let service = queries::get_service(conn, service_code)?
        .filter(|s| s.active)
        .ok_or_else(|| BookingError::InvalidService(service_code.to_string()))?;

    let date = parse_date(date)
        .ok_or_else(|| BookingError::InvalidDate("Date must use the YYYY-MM-DD format.".into()))?;
    if date < ctx.clock.today() {
        return Err(BookingError::InvalidDate(
            "Bookings cannot be made for past dates.".into(),
        ));
    }

    let start_time = parse_time(start_time).map_err(|_| BookingError::InvalidTime)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = queries::get_bookings(&tx, date)?;
    if let Err(conflict) = check_slot(date, start_time, service.duration_minutes, ctx.hours, &existing)
    {
        tracing::info!(%date, start = %start_time.format("%H:%M"), %conflict, "slot rejected");
        return Err(BookingError::SlotUnavailable(conflict));
    }

    let mut new = NewBooking {
        confirmation_code: String::new(),
        customer_name: name.trim().to_string(),
        customer_phone: phone,
        service_code: service.code.clone(),
        service_name: service.name.clone(),
        price: service.price,
        date,
        start_time,
        duration_minutes: service.duration_minutes,
        notes: request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        created_at: ctx.clock.now(),
    };

    let mut inserted = None;
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        new.confirmation_code = next_code();
        match queries::insert_booking(&tx, &new) {
            Ok(booking) => {
                inserted = Some(booking);
                break;
            }
            Err(AppError::UniquenessViolation(UniqueKey::ConfirmationCode)) => {
                tracing::warn!(attempt, code = %new.confirmation_code, "confirmation code collision");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let booking = inserted.ok_or_else(|| {
        BookingError::Internal(anyhow::anyhow!(
            "confirmation code collided {MAX_CODE_ATTEMPTS} times"
        ))
    })?;

    tx.commit()?;

    tracing::info!(
        code = %booking.confirmation_code,
        date = %booking.date,
        start = %booking.start_time.format("%H:%M"),
        service = %booking.service_code,
        "booking confirmed"
    );
    Ok(booking)
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, BookingError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(BookingError::MissingField(field))
}

/// Cancels a confirmed booking. Unknown and already-cancelled codes are
/// `NotFound`, so the transition happens at most once.
pub fn cancel(
    conn: &Connection,
    confirmation_code: &str,
    reason: Option<&str>,
    clock: &dyn Clock,
) -> Result<(), BookingError> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    let affected = queries::update_booking_status(
        conn,
        confirmation_code.trim(),
        BookingStatus::Cancelled,
        reason,
        clock.now(),
    )?;

    if affected == 0 {
        return Err(BookingError::NotFound);
    }

    tracing::info!(code = %confirmation_code, "booking cancelled");
    Ok(())
}

pub fn lookup(conn: &Connection, confirmation_code: &str) -> Result<Booking, BookingError> {
    queries::get_booking(conn, confirmation_code.trim())?.ok_or(BookingError::NotFound)
}
