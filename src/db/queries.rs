use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::Serialize;

use crate::errors::{AppError, UniqueKey};
use crate::models::{Booking, BookingStatus, BusinessHours, NewBooking, Service};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, confirmation_code, customer_name, customer_phone, service_code, \
     service_name, price, date, start_time, duration_minutes, status, notes, created_at, \
     cancelled_at, cancellation_reason";

// ── Bookings ──

/// Confirmed bookings on `date`, ordered by start time.
pub fn get_bookings(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE date = ?1 AND status = 'confirmed' ORDER BY start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking(conn: &Connection, confirmation_code: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE confirmation_code = ?1");
    let result = conn.query_row(&sql, params![confirmation_code], |row| {
        Ok(parse_booking_row(row))
    });

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Inserts a confirmed booking. Collisions on the confirmation code or on the
/// confirmed `(date, start_time)` index come back as `UniquenessViolation`.
pub fn insert_booking(conn: &Connection, new: &NewBooking) -> Result<Booking, AppError> {
    let result = conn.execute(
        "INSERT INTO bookings (confirmation_code, customer_name, customer_phone, service_code,
                               service_name, price, date, start_time, duration_minutes, status,
                               notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'confirmed', ?10, ?11)",
        params![
            new.confirmation_code,
            new.customer_name,
            new.customer_phone,
            new.service_code,
            new.service_name,
            new.price,
            new.date.format(DATE_FORMAT).to_string(),
            new.start_time.format(TIME_FORMAT).to_string(),
            new.duration_minutes,
            new.notes,
            new.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    );

    if let Err(e) = result {
        return Err(match unique_violation(&e) {
            Some(key) => AppError::UniquenessViolation(key),
            None => AppError::Database(e),
        });
    }

    Ok(Booking {
        id: conn.last_insert_rowid(),
        confirmation_code: new.confirmation_code.clone(),
        customer_name: new.customer_name.clone(),
        customer_phone: new.customer_phone.clone(),
        service_code: new.service_code.clone(),
        service_name: new.service_name.clone(),
        price: new.price,
        date: new.date,
        start_time: new.start_time,
        duration_minutes: new.duration_minutes,
        status: BookingStatus::Confirmed,
        notes: new.notes.clone(),
        created_at: new.created_at,
        cancelled_at: None,
        cancellation_reason: None,
    })
}

/// Moves a confirmed booking to `status`. The only allowed transition is
/// confirmed -> cancelled; a repeated cancellation affects nothing.
pub fn update_booking_status(
    conn: &Connection,
    confirmation_code: &str,
    status: BookingStatus,
    reason: Option<&str>,
    at: NaiveDateTime,
) -> anyhow::Result<usize> {
    if status != BookingStatus::Cancelled {
        anyhow::bail!("booking {confirmation_code} cannot move to {}", status.as_str());
    }

    let count = conn.execute(
        "UPDATE bookings
         SET status = 'cancelled', cancelled_at = ?1, cancellation_reason = ?2
         WHERE confirmation_code = ?3 AND status = 'confirmed'",
        params![at.format(TIMESTAMP_FORMAT).to_string(), reason, confirmation_code],
    )?;
    Ok(count)
}

/// Upcoming confirmed bookings for a customer, from `from` onwards.
pub fn get_bookings_for_phone(
    conn: &Connection,
    phone: &str,
    from: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE customer_phone = ?1 AND date >= ?2 AND status = 'confirmed'
         ORDER BY date ASC, start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![phone, from.format(DATE_FORMAT).to_string()],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    date_filter: Option<NaiveDate>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR date = ?2)
         ORDER BY date ASC, start_time ASC LIMIT ?3"
    );
    let status = status_filter.map(|s| s.as_str());
    let date = date_filter.map(|d| d.format(DATE_FORMAT).to_string());

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![status, date, limit], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

#[derive(Debug, Serialize)]
pub struct BookingStats {
    pub total: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub revenue: f64,
    pub average_ticket: f64,
    /// Percentage of all bookings that were cancelled, two decimals.
    pub cancellation_rate: f64,
}

/// Aggregates over bookings created between `from` and `to`, both inclusive.
pub fn get_booking_stats(
    conn: &Connection,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> anyhow::Result<BookingStats> {
    let from = from.map(|d| d.format(DATE_FORMAT).to_string());
    let to = to.map(|d| d.format(DATE_FORMAT).to_string());

    let (total, confirmed, cancelled, revenue, average): (i64, i64, i64, f64, Option<f64>) = conn
        .query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'confirmed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'confirmed' THEN price ELSE 0 END), 0),
                    AVG(CASE WHEN status = 'confirmed' THEN price END)
             FROM bookings
             WHERE (?1 IS NULL OR substr(created_at, 1, 10) >= ?1)
               AND (?2 IS NULL OR substr(created_at, 1, 10) <= ?2)",
            params![from, to],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;

    let cancellation_rate = if total > 0 {
        (cancelled as f64 / total as f64 * 10_000.0).round() / 100.0
    } else {
        0.0
    };

    Ok(BookingStats {
        total,
        confirmed,
        cancelled,
        revenue,
        average_ticket: average.unwrap_or(0.0),
        cancellation_rate,
    })
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(7)?;
    let start_str: String = row.get(8)?;
    let status_str: String = row.get(10)?;
    let created_at_str: String = row.get(12)?;
    let cancelled_at_str: Option<String> = row.get(13)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?;
    let start_time = NaiveTime::parse_from_str(&start_str, TIME_FORMAT)?;
    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status: {status_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)?;
    let cancelled_at = cancelled_at_str
        .map(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT))
        .transpose()?;

    Ok(Booking {
        id: row.get(0)?,
        confirmation_code: row.get(1)?,
        customer_name: row.get(2)?,
        customer_phone: row.get(3)?,
        service_code: row.get(4)?,
        service_name: row.get(5)?,
        price: row.get(6)?,
        date,
        start_time,
        duration_minutes: row.get(9)?,
        status,
        notes: row.get(11)?,
        created_at,
        cancelled_at,
        cancellation_reason: row.get(14)?,
    })
}

fn unique_violation(err: &rusqlite::Error) -> Option<UniqueKey> {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) if e.code == ErrorCode::ConstraintViolation => {
            if msg.contains("confirmation_code") {
                Some(UniqueKey::ConfirmationCode)
            } else if msg.contains("bookings.date") {
                Some(UniqueKey::Slot)
            } else {
                None
            }
        }
        _ => None,
    }
}

// ── Services ──

pub fn get_service(conn: &Connection, code: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT code, name, description, duration_minutes, price, active
             FROM services WHERE code = ?1",
            params![code],
            parse_service_row,
        )
        .optional()?;
    Ok(service)
}

/// Active services, cheapest first.
pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT code, name, description, duration_minutes, price, active
         FROM services WHERE active = 1 ORDER BY price ASC, code ASC",
    )?;
    let rows = stmt.query_map([], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    Ok(Service {
        code: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        duration_minutes: row.get(3)?,
        price: row.get(4)?,
        active: row.get::<_, i32>(5)? != 0,
    })
}

// ── Settings ──

/// Raw JSON value of a setting.
pub fn get_config(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

pub fn load_business_hours(conn: &Connection) -> Result<BusinessHours, AppError> {
    BusinessHours::from_settings(|key| Ok(get_config(conn, key)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn new_booking(code: &str, date: &str, time: &str) -> NewBooking {
        NewBooking {
            confirmation_code: code.to_string(),
            customer_name: "Alice".to_string(),
            customer_phone: "(16) 99745-5195".to_string(),
            service_code: "corte".to_string(),
            service_name: "Corte Social".to_string(),
            price: 45.0,
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            start_time: NaiveTime::parse_from_str(time, TIME_FORMAT).unwrap(),
            duration_minutes: 30,
            notes: None,
            created_at: NaiveDateTime::parse_from_str("2025-06-10 10:00:00", TIMESTAMP_FORMAT)
                .unwrap(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_insert_and_get_booking() {
        let conn = setup_db();
        let inserted = insert_booking(&conn, &new_booking("BS1", "2025-06-16", "10:00")).unwrap();
        assert!(inserted.id > 0);

        let fetched = get_booking(&conn, "BS1").unwrap().unwrap();
        assert_eq!(fetched.customer_name, "Alice");
        assert_eq!(fetched.start_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(fetched.status, BookingStatus::Confirmed);
        assert!(get_booking(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_code_is_uniqueness_violation() {
        let conn = setup_db();
        insert_booking(&conn, &new_booking("BS1", "2025-06-16", "10:00")).unwrap();
        let err = insert_booking(&conn, &new_booking("BS1", "2025-06-16", "11:00")).unwrap_err();
        assert!(matches!(err, AppError::UniquenessViolation(UniqueKey::ConfirmationCode)));
    }

    #[test]
    fn test_duplicate_confirmed_slot_is_uniqueness_violation() {
        let conn = setup_db();
        insert_booking(&conn, &new_booking("BS1", "2025-06-16", "10:00")).unwrap();
        let err = insert_booking(&conn, &new_booking("BS2", "2025-06-16", "10:00")).unwrap_err();
        assert!(matches!(err, AppError::UniquenessViolation(UniqueKey::Slot)));
    }

    #[test]
    fn test_cancelled_slot_can_be_reused() {
        let conn = setup_db();
        insert_booking(&conn, &new_booking("BS1", "2025-06-16", "10:00")).unwrap();
        let at = NaiveDateTime::parse_from_str("2025-06-11 09:00:00", TIMESTAMP_FORMAT).unwrap();
        assert_eq!(
            update_booking_status(&conn, "BS1", BookingStatus::Cancelled, Some("sick"), at).unwrap(),
            1
        );
        insert_booking(&conn, &new_booking("BS2", "2025-06-16", "10:00")).unwrap();

        let cancelled = get_booking(&conn, "BS1").unwrap().unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("sick"));
        assert_eq!(cancelled.cancelled_at, Some(at));
    }

    #[test]
    fn test_cancel_twice_affects_nothing_second_time() {
        let conn = setup_db();
        insert_booking(&conn, &new_booking("BS1", "2025-06-16", "10:00")).unwrap();
        let at = NaiveDateTime::parse_from_str("2025-06-11 09:00:00", TIMESTAMP_FORMAT).unwrap();
        assert_eq!(update_booking_status(&conn, "BS1", BookingStatus::Cancelled, None, at).unwrap(), 1);
        assert_eq!(update_booking_status(&conn, "BS1", BookingStatus::Cancelled, None, at).unwrap(), 0);
    }

    #[test]
    fn test_cancelled_booking_cannot_be_reconfirmed() {
        let conn = setup_db();
        let mut combo = new_booking("BS1", "2025-06-16", "10:00");
        combo.duration_minutes = 50;
        insert_booking(&conn, &combo).unwrap();
        let at = NaiveDateTime::parse_from_str("2025-06-11 09:00:00", TIMESTAMP_FORMAT).unwrap();
        update_booking_status(&conn, "BS1", BookingStatus::Cancelled, None, at).unwrap();

        // 10:30 overlaps the cancelled 10:00-10:50 booking
        insert_booking(&conn, &new_booking("BS2", "2025-06-16", "10:30")).unwrap();

        assert!(update_booking_status(&conn, "BS1", BookingStatus::Confirmed, None, at).is_err());
        assert!(update_booking_status(&conn, "BS2", BookingStatus::Confirmed, None, at).is_err());

        let confirmed: Vec<String> = get_bookings(&conn, day("2025-06-16"))
            .unwrap()
            .into_iter()
            .map(|b| b.confirmation_code)
            .collect();
        assert_eq!(confirmed, vec!["BS2"]);
        let first = get_booking(&conn, "BS1").unwrap().unwrap();
        assert_eq!(first.status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_get_bookings_only_confirmed_in_order() {
        let conn = setup_db();
        insert_booking(&conn, &new_booking("BS1", "2025-06-16", "14:00")).unwrap();
        insert_booking(&conn, &new_booking("BS2", "2025-06-16", "09:00")).unwrap();
        insert_booking(&conn, &new_booking("BS3", "2025-06-17", "09:00")).unwrap();
        insert_booking(&conn, &new_booking("BS4", "2025-06-16", "11:00")).unwrap();
        let at = NaiveDateTime::parse_from_str("2025-06-11 09:00:00", TIMESTAMP_FORMAT).unwrap();
        update_booking_status(&conn, "BS4", BookingStatus::Cancelled, None, at).unwrap();

        let codes: Vec<String> = get_bookings(&conn, day("2025-06-16"))
            .unwrap()
            .into_iter()
            .map(|b| b.confirmation_code)
            .collect();
        assert_eq!(codes, vec!["BS2", "BS1"]);
    }

    #[test]
    fn test_bookings_for_phone_from_date() {
        let conn = setup_db();
        insert_booking(&conn, &new_booking("BS1", "2025-06-10", "10:00")).unwrap();
        insert_booking(&conn, &new_booking("BS2", "2025-06-16", "10:00")).unwrap();

        let upcoming = get_bookings_for_phone(&conn, "(16) 99745-5195", day("2025-06-12")).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].confirmation_code, "BS2");
    }

    #[test]
    fn test_get_all_bookings_filters() {
        let conn = setup_db();
        insert_booking(&conn, &new_booking("BS1", "2025-06-16", "10:00")).unwrap();
        insert_booking(&conn, &new_booking("BS2", "2025-06-17", "10:00")).unwrap();
        let at = NaiveDateTime::parse_from_str("2025-06-11 09:00:00", TIMESTAMP_FORMAT).unwrap();
        update_booking_status(&conn, "BS2", BookingStatus::Cancelled, None, at).unwrap();

        assert_eq!(get_all_bookings(&conn, None, None, 50).unwrap().len(), 2);
        assert_eq!(
            get_all_bookings(&conn, Some(BookingStatus::Cancelled), None, 50).unwrap()[0]
                .confirmation_code,
            "BS2"
        );
        assert_eq!(
            get_all_bookings(&conn, None, Some(day("2025-06-16")), 50).unwrap()[0]
                .confirmation_code,
            "BS1"
        );
        assert_eq!(get_all_bookings(&conn, None, None, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_booking_stats() {
        let conn = setup_db();
        let empty = get_booking_stats(&conn, None, None).unwrap();
        assert_eq!(empty.total, 0);
        assert_eq!(empty.cancellation_rate, 0.0);

        insert_booking(&conn, &new_booking("BS1", "2025-06-16", "10:00")).unwrap();
        insert_booking(&conn, &new_booking("BS2", "2025-06-16", "11:00")).unwrap();
        insert_booking(&conn, &new_booking("BS3", "2025-06-16", "14:00")).unwrap();
        let at = NaiveDateTime::parse_from_str("2025-06-11 09:00:00", TIMESTAMP_FORMAT).unwrap();
        update_booking_status(&conn, "BS3", BookingStatus::Cancelled, None, at).unwrap();

        let stats = get_booking_stats(&conn, None, None).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.confirmed, 2);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.revenue, 90.0);
        assert_eq!(stats.average_ticket, 45.0);
        assert_eq!(stats.cancellation_rate, 33.33);

        let outside = get_booking_stats(&conn, Some(day("2025-06-11")), None).unwrap();
        assert_eq!(outside.total, 0);
    }

    #[test]
    fn test_services_seeded_and_sorted_by_price() {
        let conn = setup_db();
        let codes: Vec<String> = list_services(&conn).unwrap().into_iter().map(|s| s.code).collect();
        assert_eq!(codes, vec!["kids", "corte", "degrade", "combo"]);

        let combo = get_service(&conn, "combo").unwrap().unwrap();
        assert_eq!(combo.duration_minutes, 50);
        assert!(get_service(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_config_roundtrip_and_hours() {
        let conn = setup_db();
        assert_eq!(get_config(&conn, "slot_interval").unwrap().as_deref(), Some("30"));
        assert!(get_config(&conn, "unknown").unwrap().is_none());

        set_config(&conn, "slot_interval", "15").unwrap();
        let hours = load_business_hours(&conn).unwrap();
        assert_eq!(hours.slot_interval_minutes, 15);
        assert_eq!(hours.working_days, vec![1, 2, 3, 4, 5, 6]);
    }
}
