use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use parkspot::config::AppConfig;
use parkspot::db;
use parkspot::handlers;
use parkspot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/parking/zones", post(handlers::zones::create_zone))
        .route("/parking/zones", get(handlers::zones::list_zones))
        .route("/parking/zones/search", get(handlers::zones::search_zones))
        .route("/parking/zones/nearby", get(handlers::zones::nearby_zones))
        .route("/parking/zones/my-zone", get(handlers::zones::my_zone))
        .route(
            "/parking/zones/:zone_id/availability",
            patch(handlers::zones::update_availability),
        )
        .route(
            "/parking/zones/:zone_id/slots",
            post(handlers::slots::create_slot),
        )
        .route(
            "/parking/zones/:zone_id/slots",
            get(handlers::slots::list_slots),
        )
        .route(
            "/parking/zones/:zone_id/slots/stats",
            get(handlers::slots::slot_statistics),
        )
        .route(
            "/parking/zones/:zone_id/slots/:slot_id/status",
            patch(handlers::slots::update_slot_status),
        )
        .route(
            "/parking/zones/:zone_id/slots/:slot_id",
            delete(handlers::slots::delete_slot),
        )
        .route("/parking/bookings", post(handlers::bookings::create_booking))
        .route(
            "/parking/bookings/active",
            get(handlers::bookings::active_booking),
        )
        .route(
            "/parking/bookings/history",
            get(handlers::bookings::booking_history),
        )
        .route(
            "/parking/bookings/:booking_id/extend",
            patch(handlers::bookings::extend_booking),
        )
        .route(
            "/parking/bookings/:booking_id/complete",
            patch(handlers::bookings::complete_booking),
        )
        .route(
            "/parking/bookings/:booking_id/cancel",
            patch(handlers::bookings::cancel_booking),
        )
        .route("/parking/profile/stats", get(handlers::stats::driver_stats))
        .route(
            "/parking/admin/bookings",
            get(handlers::stats::zone_bookings),
        )
        .route(
            "/parking/admin/bookings/stats",
            get(handlers::stats::zone_booking_stats),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
