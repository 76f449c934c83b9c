use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::auth::{authenticate, require_admin};
use crate::models::ParkingZone;
use crate::services::zones;
use crate::state::AppState;

// POST /parking/zones
#[derive(Deserialize)]
pub struct CreateZoneRequest {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_slots: i64,
}

pub async fn create_zone(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateZoneRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    if body.name.len() < 3 || body.name.len() > 100 {
        return Err(AppError::InvalidArgument(
            "zone name must be 3-100 characters".to_string(),
        ));
    }
    check_coordinates(body.latitude, body.longitude)?;
    if body.total_slots <= 0 {
        return Err(AppError::InvalidArgument(
            "total slots must be positive".to_string(),
        ));
    }

    let mut db = state.db.lock().unwrap();
    let zone = zones::create_zone(
        &mut db,
        admin.id,
        &zones::ZoneSpec {
            name: body.name,
            latitude: body.latitude,
            longitude: body.longitude,
            total_slots: body.total_slots,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "parking zone created successfully",
            "zone_id": zone.id,
            "name": zone.name,
        })),
    ))
}

// PATCH /parking/zones/:zone_id/availability
#[derive(Deserialize)]
pub struct AvailabilityUpdate {
    pub available_slots: i64,
}

pub async fn update_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(zone_id): Path<i64>,
    Json(body): Json<AvailabilityUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    let mut db = state.db.lock().unwrap();
    let zone = zones::update_availability(&mut db, admin.id, zone_id, body.available_slots)?;

    Ok(Json(serde_json::json!({
        "message": "availability updated",
        "available_slots": zone.available_slots,
        "total_slots": zone.total_slots,
    })))
}

// GET /parking/zones
pub async fn list_zones(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ParkingZone>>, AppError> {
    authenticate(&state, &headers)?;

    let db = state.db.lock().unwrap();
    Ok(Json(zones::list_zones(&db)?))
}

// GET /parking/zones/search?name=
#[derive(Deserialize)]
pub struct SearchQuery {
    pub name: String,
}

pub async fn search_zones(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ParkingZone>>, AppError> {
    authenticate(&state, &headers)?;

    if query.name.is_empty() {
        return Err(AppError::InvalidArgument(
            "search name must not be empty".to_string(),
        ));
    }

    let db = state.db.lock().unwrap();
    Ok(Json(zones::search_zones(&db, &query.name)?))
}

// GET /parking/zones/nearby?latitude=&longitude=&radius_km=
#[derive(Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
}

pub async fn nearby_zones(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<zones::NearbyZone>>, AppError> {
    authenticate(&state, &headers)?;

    check_coordinates(query.latitude, query.longitude)?;
    let radius_km = query.radius_km.unwrap_or(5.0);
    if radius_km <= 0.0 || radius_km > 50.0 {
        return Err(AppError::InvalidArgument(
            "radius must be within (0, 50] km".to_string(),
        ));
    }

    let db = state.db.lock().unwrap();
    Ok(Json(zones::nearby_zones(
        &db,
        query.latitude,
        query.longitude,
        radius_km,
    )?))
}

// GET /parking/zones/my-zone
pub async fn my_zone(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ParkingZone>, AppError> {
    let admin = authenticate(&state, &headers)?;
    require_admin(&admin)?;

    let db = state.db.lock().unwrap();
    Ok(Json(zones::my_zone(&db, admin.id)?))
}

fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::InvalidArgument(
            "latitude must be within [-90, 90]".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::InvalidArgument(
            "longitude must be within [-180, 180]".to_string(),
        ));
    }
    Ok(())
}
