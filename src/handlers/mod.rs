pub mod admin;
pub mod health;
pub mod public;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/services", get(public::list_services))
        .route("/api/slots", get(public::get_slots))
        .route(
            "/api/bookings",
            get(public::bookings_for_phone).post(public::create_booking),
        )
        .route("/api/bookings/:code", get(public::get_booking))
        .route("/api/bookings/:code/cancel", post(public::cancel_booking))
        .route("/api/admin/bookings", get(admin::get_bookings))
        .route(
            "/api/admin/bookings/:code/cancel",
            post(admin::cancel_booking),
        )
        .route("/api/admin/stats", get(admin::get_stats))
        .route("/api/admin/settings", get(admin::get_settings))
        .route("/api/admin/settings/:key", put(admin::update_setting))
        .with_state(state)
}
