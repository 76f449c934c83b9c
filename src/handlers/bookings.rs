use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::auth::{authenticate, require_driver};
use crate::models::BookingStatus;
use crate::services::bookings;
use crate::state::AppState;

// POST /parking/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub zone_id: i64,
    pub slot_id: Option<i64>,
    #[serde(default = "default_duration")]
    pub duration_hours: i64,
}

fn default_duration() -> i64 {
    1
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let driver = authenticate(&state, &headers)?;
    require_driver(&driver)?;

    if !(1..=24).contains(&body.duration_hours) {
        return Err(AppError::InvalidArgument(
            "duration must be within 1-24 hours".to_string(),
        ));
    }

    let mut db = state.db.lock().unwrap();
    let confirmation = bookings::create_booking(
        &mut db,
        driver.id,
        &bookings::BookingRequest {
            zone_id: body.zone_id,
            slot_id: body.slot_id,
            duration_hours: body.duration_hours,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "booking created successfully",
            "booking_id": confirmation.booking_id,
            "zone_name": confirmation.zone_name,
            "slot_number": confirmation.slot_number,
            "start_time": confirmation.start_time,
            "end_time": confirmation.end_time,
            "duration_hours": confirmation.duration_hours,
            "amount_paid": confirmation.amount_paid,
        })),
    ))
}

// GET /parking/bookings/active
pub async fn active_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<bookings::EnrichedBooking>, AppError> {
    let driver = authenticate(&state, &headers)?;
    require_driver(&driver)?;

    let db = state.db.lock().unwrap();
    Ok(Json(bookings::active_booking(&db, driver.id)?))
}

// PATCH /parking/bookings/:booking_id/extend
#[derive(Deserialize)]
pub struct ExtendRequest {
    pub additional_hours: i64,
}

pub async fn extend_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
    Json(body): Json<ExtendRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let driver = authenticate(&state, &headers)?;
    require_driver(&driver)?;

    if !(1..=12).contains(&body.additional_hours) {
        return Err(AppError::InvalidArgument(
            "additional hours must be within 1-12".to_string(),
        ));
    }

    let mut db = state.db.lock().unwrap();
    let receipt =
        bookings::extend_booking(&mut db, driver.id, booking_id, body.additional_hours)?;

    Ok(Json(serde_json::json!({
        "message": "booking extended successfully",
        "booking_id": receipt.booking_id,
        "new_end_time": receipt.new_end_time,
        "additional_hours": receipt.additional_hours,
        "additional_amount": receipt.additional_amount,
        "total_amount": receipt.total_amount,
        "total_duration": receipt.total_duration,
    })))
}

// PATCH /parking/bookings/:booking_id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let driver = authenticate(&state, &headers)?;
    require_driver(&driver)?;

    let mut db = state.db.lock().unwrap();
    let receipt = bookings::complete_booking(&mut db, driver.id, booking_id)?;

    Ok(Json(serde_json::json!({
        "message": "booking completed successfully",
        "booking_id": receipt.booking_id,
        "slot_number": receipt.slot_number,
        "zone_name": receipt.zone_name,
        "amount_paid": receipt.amount_paid,
        "duration_hours": receipt.duration_hours,
    })))
}

// PATCH /parking/bookings/:booking_id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let driver = authenticate(&state, &headers)?;
    require_driver(&driver)?;

    let mut db = state.db.lock().unwrap();
    let receipt = bookings::cancel_booking(&mut db, driver.id, booking_id)?;

    Ok(Json(serde_json::json!({
        "message": "booking cancelled successfully",
        "booking_id": receipt.booking_id,
        "refund_amount": receipt.refund_amount,
    })))
}

// GET /parking/bookings/history?status=&limit=&skip=
#[derive(Deserialize)]
pub struct HistoryQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

pub async fn booking_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<bookings::HistoryEntry>>, AppError> {
    let driver = authenticate(&state, &headers)?;
    require_driver(&driver)?;

    let status = parse_status_filter(query.status.as_deref())?;
    let limit = check_page(query.limit.unwrap_or(10), query.skip.unwrap_or(0))?;

    let db = state.db.lock().unwrap();
    Ok(Json(bookings::booking_history(
        &db,
        driver.id,
        status,
        limit,
        query.skip.unwrap_or(0),
    )?))
}

pub(crate) fn parse_status_filter(status: Option<&str>) -> Result<Option<BookingStatus>, AppError> {
    status
        .map(|s| {
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::InvalidArgument(format!("unknown booking status: {s}")))
        })
        .transpose()
}

pub(crate) fn check_page(limit: i64, skip: i64) -> Result<i64, AppError> {
    if !(1..=100).contains(&limit) {
        return Err(AppError::InvalidArgument(
            "limit must be within 1-100".to_string(),
        ));
    }
    if skip < 0 {
        return Err(AppError::InvalidArgument("skip must be >= 0".to_string()));
    }
    Ok(limit)
}
