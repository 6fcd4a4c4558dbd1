use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingStats};
use crate::errors::AppError;
use crate::models::business_hours::SETTING_KEYS;
use crate::models::{Booking, BookingStatus};
use crate::services::booking;
use crate::services::validation::parse_date;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn optional_date(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("{field} must use the YYYY-MM-DD format"))),
    }
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        None => None,
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status '{s}'")))?,
        ),
    };
    let date = optional_date(query.date.as_deref(), "date")?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let bookings = state
        .db
        .with(|db| queries::get_all_bookings(db, status, date, limit).map_err(AppError::from))?;
    Ok(Json(bookings))
}

// POST /api/admin/bookings/:code/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let reason = body
        .and_then(|Json(b)| b.reason)
        .unwrap_or_else(|| "Cancelled by the shop".to_string());

    state.db.with(|db| {
        booking::cancel(db, &code, Some(&reason), state.clock.as_ref()).map_err(AppError::from)
    })?;

    Ok(Json(serde_json::json!({"success": true})))
}

// GET /api/admin/stats
#[derive(Deserialize)]
pub struct StatsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StatsQuery>,
) -> Result<Json<BookingStats>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let from = optional_date(query.from.as_deref(), "from")?;
    let to = optional_date(query.to.as_deref(), "to")?;

    let stats = state
        .db
        .with(|db| queries::get_booking_stats(db, from, to).map_err(AppError::from))?;
    Ok(Json(stats))
}

// GET /api/admin/settings
#[derive(Serialize)]
pub struct SettingsResponse {
    settings: serde_json::Map<String, serde_json::Value>,
    business_hours: String,
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SettingsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let settings = state.db.with(|db| -> Result<_, AppError> {
        let mut settings = serde_json::Map::new();
        for key in SETTING_KEYS {
            let value = match queries::get_config(db, key)? {
                Some(raw) => serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw)),
                None => serde_json::Value::Null,
            };
            settings.insert(key.to_string(), value);
        }
        Ok(settings)
    })?;

    Ok(Json(SettingsResponse {
        settings,
        business_hours: state.hours().to_human_readable(),
    }))
}

// PUT /api/admin/settings/:key
#[derive(Deserialize)]
pub struct UpdateSettingRequest {
    pub value: serde_json::Value,
}

pub async fn update_setting(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(body): Json<UpdateSettingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if !SETTING_KEYS.contains(&key.as_str()) {
        return Err(AppError::NotFound(format!("setting '{key}'")));
    }

    let hours = state.db.with(|db| -> Result<_, AppError> {
        let tx = db.transaction()?;
        queries::set_config(&tx, &key, &body.value.to_string())?;
        // An invalid combination is rejected here and the write rolls back with `tx`.
        let hours = queries::load_business_hours(&tx)?;
        tx.commit()?;
        Ok(hours)
    })?;

    tracing::info!(%key, value = %body.value, hours = %hours.to_human_readable(), "setting updated");
    state.replace_hours(hours);

    Ok(Json(serde_json::json!({"success": true, "key": key, "value": body.value})))
}
