use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::{AppError, BookingError};
use crate::models::{Booking, Service};
use crate::services::booking::{self, Admission, BookingRequest};
use crate::services::notification::{self, Confirmation};
use crate::services::scheduling::available_slots;
use crate::services::validation::{normalize_phone, parse_date};
use crate::state::AppState;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = state
        .db
        .with(|db| queries::list_services(db).map_err(AppError::from))?;
    Ok(Json(services))
}

// GET /api/slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
    pub service_code: Option<String>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<String>>, BookingError> {
    let raw_date = query
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or(BookingError::MissingField("date"))?;
    let date = parse_date(raw_date)
        .ok_or_else(|| BookingError::InvalidDate("Date must use the YYYY-MM-DD format.".into()))?;

    let hours = state.hours();

    let (duration, bookings) = state.db.with(|db| -> Result<_, BookingError> {
        let duration = match query.service_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                queries::get_service(db, code)?
                    .filter(|s| s.active)
                    .ok_or_else(|| BookingError::InvalidService(code.to_string()))?
                    .duration_minutes
            }
            _ => i32::try_from(hours.default_duration_minutes)
                .map_err(|e| BookingError::Internal(e.into()))?,
        };
        Ok((duration, queries::get_bookings(db, date)?))
    })?;
    let slots = available_slots(date, duration, &hours, &bookings, state.clock.as_ref());

    Ok(Json(
        slots
            .into_iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect(),
    ))
}

// POST /api/bookings
#[derive(Serialize)]
pub struct CreatedResponse {
    success: bool,
    confirmation_code: String,
    booking: Booking,
    whatsapp: Option<Confirmation>,
    message: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), BookingError> {
    let hours = state.hours();
    let ctx = Admission {
        hours: &hours,
        clock: state.clock.as_ref(),
        phone_country_code: &state.config.phone_country_code,
    };

    let booking = state.db.with(|db| booking::admit(db, &ctx, &request))?;

    // Already committed; a link failure must not fail the request.
    let whatsapp = match notification::confirmation(&booking, &state.config) {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::warn!(error = %e, code = %booking.confirmation_code, "could not build WhatsApp links");
            None
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            confirmation_code: booking.confirmation_code.clone(),
            booking,
            whatsapp,
            message: "Booking confirmed.".to_string(),
        }),
    ))
}

// GET /api/bookings/:code
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Booking>, BookingError> {
    let booking = state.db.with(|db| booking::lookup(db, &code))?;
    Ok(Json(booking))
}

// GET /api/bookings?phone=
#[derive(Deserialize)]
pub struct PhoneQuery {
    pub phone: Option<String>,
}

pub async fn bookings_for_phone(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<Vec<Booking>>, BookingError> {
    let raw = query
        .phone
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or(BookingError::MissingField("phone"))?;
    let phone =
        normalize_phone(raw, &state.config.phone_country_code).ok_or(BookingError::InvalidPhone)?;

    let today = state.clock.today();
    let bookings = state.db.with(|db| {
        queries::get_bookings_for_phone(db, &phone, today).map_err(BookingError::from)
    })?;
    Ok(Json(bookings))
}

// POST /api/bookings/:code/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<serde_json::Value>, BookingError> {
    let reason = body.and_then(|Json(b)| b.reason);

    state
        .db
        .with(|db| booking::cancel(db, &code, reason.as_deref(), state.clock.as_ref()))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Booking cancelled.",
    })))
}
