use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::auth::{authenticate, require_admin};
use crate::models::{ParkingSlot, SlotStatus, VehicleType};
use crate::services::slots;
use crate::state::AppState;

// POST /parking/zones/:zone_id/slots
#[derive(Deserialize)]
pub struct CreateSlotRequest {
    pub slot_number: String,
    pub vehicle_type: VehicleType,
    #[serde(default = "default_price")]
    pub price_per_hour: f64,
}

fn default_price() -> f64 {
    20.0
}

pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(zone_id): Path<i64>,
    Json(body): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    if body.slot_number.is_empty() || body.slot_number.len() > 10 {
        return Err(AppError::InvalidArgument(
            "slot number must be 1-10 characters".to_string(),
        ));
    }
    if body.price_per_hour <= 0.0 {
        return Err(AppError::InvalidArgument(
            "price per hour must be positive".to_string(),
        ));
    }

    let mut db = state.db.lock().unwrap();
    let slot = slots::create_slot(
        &mut db,
        admin.id,
        zone_id,
        &slots::SlotSpec {
            slot_number: body.slot_number,
            vehicle_type: body.vehicle_type,
            price_per_hour: body.price_per_hour,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "slot created successfully",
            "slot_id": slot.id,
            "slot_number": slot.slot_number,
        })),
    ))
}

// GET /parking/zones/:zone_id/slots?vehicle_type=&status=
#[derive(Deserialize)]
pub struct SlotFilters {
    pub vehicle_type: Option<String>,
    pub status: Option<String>,
}

pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(zone_id): Path<i64>,
    Query(filters): Query<SlotFilters>,
) -> Result<Json<Vec<ParkingSlot>>, AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    let vehicle_type = filters
        .vehicle_type
        .as_deref()
        .map(|s| {
            VehicleType::parse(s)
                .ok_or_else(|| AppError::InvalidArgument(format!("unknown vehicle type: {s}")))
        })
        .transpose()?;
    let status = filters
        .status
        .as_deref()
        .map(|s| {
            SlotStatus::parse(s)
                .ok_or_else(|| AppError::InvalidArgument(format!("unknown slot status: {s}")))
        })
        .transpose()?;

    let db = state.db.lock().unwrap();
    Ok(Json(slots::list_slots(
        &db,
        admin.id,
        zone_id,
        vehicle_type,
        status,
    )?))
}

// PATCH /parking/zones/:zone_id/slots/:slot_id/status
#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: SlotStatus,
}

pub async fn update_slot_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((zone_id, slot_id)): Path<(i64, i64)>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    let mut db = state.db.lock().unwrap();
    let change = slots::update_slot_status(&mut db, admin.id, zone_id, slot_id, body.status)?;

    if !change.changed {
        return Ok(Json(serde_json::json!({
            "message": "slot status unchanged",
            "slot_number": change.slot_number,
            "status": change.new_status,
        })));
    }

    Ok(Json(serde_json::json!({
        "message": "slot status updated successfully",
        "slot_number": change.slot_number,
        "old_status": change.old_status,
        "new_status": change.new_status,
        "zone_available_slots": change.zone_available_slots,
        "zone_total_slots": change.zone_total_slots,
    })))
}

// DELETE /parking/zones/:zone_id/slots/:slot_id
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((zone_id, slot_id)): Path<(i64, i64)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    let mut db = state.db.lock().unwrap();
    let deletion = slots::delete_slot(&mut db, admin.id, zone_id, slot_id)?;

    Ok(Json(serde_json::json!({
        "message": "slot deleted successfully",
        "deleted_slot": deletion.deleted_slot,
        "zone_total_slots": deletion.zone_total_slots,
        "zone_available_slots": deletion.zone_available_slots,
    })))
}

// GET /parking/zones/:zone_id/slots/stats
pub async fn slot_statistics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(zone_id): Path<i64>,
) -> Result<Json<slots::SlotStatistics>, AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    let db = state.db.lock().unwrap();
    Ok(Json(slots::slot_statistics(&db, admin.id, zone_id)?))
}
