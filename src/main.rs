use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use barbershop::config::AppConfig;
use barbershop::db;
use barbershop::db::queries;
use barbershop::handlers;
use barbershop::services::clock::SystemClock;
use barbershop::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let pool = db::Pool::open(&config.database_url)
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let hours = pool
        .with(|db| queries::load_business_hours(db))
        .context("invalid business hours settings")?;
    tracing::info!("business hours: {}", hours.to_human_readable());

    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is not set, admin endpoints use the default token");
    }
    if config.shop_whatsapp.is_empty() {
        tracing::warn!("SHOP_WHATSAPP is not set, WhatsApp links will not reach the shop");
    }

    let state = Arc::new(AppState::new(pool, config.clone(), hours, Box::new(SystemClock)));

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
