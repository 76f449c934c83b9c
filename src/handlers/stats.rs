use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::auth::{authenticate, require_admin, require_driver};
use crate::handlers::bookings::{check_page, parse_status_filter};
use crate::services::bookings::EnrichedBooking;
use crate::services::stats;
use crate::state::AppState;

// GET /parking/profile/stats
pub async fn driver_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<stats::DriverStats>, AppError> {
    let driver = authenticate(&state, &headers)?;
    require_driver(&driver)?;

    let db = state.db.lock().unwrap();
    Ok(Json(stats::driver_stats(&db, driver.id)?))
}

// GET /parking/admin/bookings?status=&limit=&skip=
#[derive(Deserialize)]
pub struct ZoneBookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

pub async fn zone_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ZoneBookingsQuery>,
) -> Result<Json<Vec<EnrichedBooking>>, AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    let status = parse_status_filter(query.status.as_deref())?;
    let limit = check_page(query.limit.unwrap_or(20), query.skip.unwrap_or(0))?;

    let db = state.db.lock().unwrap();
    Ok(Json(stats::zone_bookings(
        &db,
        admin.id,
        status,
        limit,
        query.skip.unwrap_or(0),
    )?))
}

// GET /parking/admin/bookings/stats
pub async fn zone_booking_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<stats::ZoneBookingStats>, AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    let db = state.db.lock().unwrap();
    Ok(Json(stats::zone_booking_stats(&db, admin.id)?))
}
