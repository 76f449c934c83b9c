use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::ParkingZone;
use crate::services::geo;

pub struct ZoneSpec {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_slots: i64,
}

/// One zone per admin. New zones start with every slot counted as available.
pub fn create_zone(
    conn: &mut Connection,
    admin_id: i64,
    spec: &ZoneSpec,
) -> Result<ParkingZone, AppError> {
    let tx = conn.transaction()?;

    if queries::get_zone_by_admin(&tx, admin_id)?.is_some() {
        return Err(AppError::Conflict(
            "you already manage a parking zone".to_string(),
        ));
    }

    let zone_id = queries::insert_zone(
        &tx,
        &spec.name,
        spec.latitude,
        spec.longitude,
        spec.total_slots,
        admin_id,
    )?;
    let zone = queries::get_zone(&tx, zone_id)?
        .ok_or_else(|| AppError::NotFound("zone not found".to_string()))?;

    tx.commit()?;
    tracing::info!(zone_id, admin_id, "parking zone created");
    Ok(zone)
}

/// Direct overwrite of the cached counter. An escape hatch for zones without
/// a slot grid; with a grid present it can drift from actual slot statuses.
pub fn update_availability(
    conn: &mut Connection,
    admin_id: i64,
    zone_id: i64,
    available_slots: i64,
) -> Result<ParkingZone, AppError> {
    let tx = conn.transaction()?;

    let zone = owned_zone(&tx, admin_id, zone_id)?;
    if available_slots < 0 {
        return Err(AppError::InvalidArgument(
            "available slots cannot be negative".to_string(),
        ));
    }
    if available_slots > zone.total_slots {
        return Err(AppError::InvalidArgument(format!(
            "available slots cannot exceed total slots ({})",
            zone.total_slots
        )));
    }

    queries::set_available_slots(&tx, zone_id, available_slots)?;
    let updated = queries::get_zone(&tx, zone_id)?
        .ok_or_else(|| AppError::NotFound("zone not found".to_string()))?;

    tx.commit()?;
    Ok(updated)
}

pub fn list_zones(conn: &Connection) -> Result<Vec<ParkingZone>, AppError> {
    Ok(queries::list_zones(conn)?)
}

pub fn search_zones(conn: &Connection, name: &str) -> Result<Vec<ParkingZone>, AppError> {
    Ok(queries::search_zones(conn, name)?)
}

#[derive(Debug, Serialize)]
pub struct NearbyZone {
    #[serde(flatten)]
    pub zone: ParkingZone,
    pub distance_km: f64,
}

/// Zones within `radius_km` of the query point, closest first. The radius
/// boundary is inclusive; ties keep zone-id order (the sort is stable).
pub fn nearby_zones(
    conn: &Connection,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> Result<Vec<NearbyZone>, AppError> {
    let mut nearby: Vec<NearbyZone> = queries::list_zones(conn)?
        .into_iter()
        .filter_map(|zone| {
            let distance_km = geo::haversine_km(latitude, longitude, zone.latitude, zone.longitude);
            (distance_km <= radius_km).then_some(NearbyZone { zone, distance_km })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    Ok(nearby)
}

pub fn my_zone(conn: &Connection, admin_id: i64) -> Result<ParkingZone, AppError> {
    queries::get_zone_by_admin(conn, admin_id)?
        .ok_or_else(|| AppError::NotFound("you don't manage any parking zone yet".to_string()))
}

/// Fetches a zone and checks it belongs to the calling admin. Reported as
/// NotFound either way so ownership is not probeable.
pub(crate) fn owned_zone(
    conn: &Connection,
    admin_id: i64,
    zone_id: i64,
) -> Result<ParkingZone, AppError> {
    match queries::get_zone(conn, zone_id)? {
        Some(zone) if zone.admin_id == admin_id => Ok(zone),
        _ => Err(AppError::NotFound(
            "zone not found or you don't have access".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::queries;
    use crate::models::Role;

    fn setup() -> (Connection, i64) {
        let conn = db::init_db(":memory:").unwrap();
        let admin_id = queries::create_user(&conn, "Admin", "a@x.com", "h", Role::Admin).unwrap();
        (conn, admin_id)
    }

    fn spec(name: &str, lat: f64, lon: f64, total: i64) -> ZoneSpec {
        ZoneSpec {
            name: name.to_string(),
            latitude: lat,
            longitude: lon,
            total_slots: total,
        }
    }

    #[test]
    fn test_create_zone_starts_fully_available() {
        let (mut conn, admin_id) = setup();
        let zone = create_zone(&mut conn, admin_id, &spec("Lot A", 12.9, 77.6, 5)).unwrap();
        assert_eq!(zone.total_slots, 5);
        assert_eq!(zone.available_slots, 5);
    }

    #[test]
    fn test_second_zone_rejected() {
        let (mut conn, admin_id) = setup();
        create_zone(&mut conn, admin_id, &spec("Lot A", 12.9, 77.6, 5)).unwrap();
        let err = create_zone(&mut conn, admin_id, &spec("Lot B", 13.0, 77.7, 3)).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_update_availability_bounds() {
        let (mut conn, admin_id) = setup();
        let zone = create_zone(&mut conn, admin_id, &spec("Lot A", 12.9, 77.6, 5)).unwrap();

        let err = update_availability(&mut conn, admin_id, zone.id, 6).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let updated = update_availability(&mut conn, admin_id, zone.id, 2).unwrap();
        assert_eq!(updated.available_slots, 2);
    }

    #[test]
    fn test_update_availability_foreign_zone_hidden() {
        let (mut conn, admin_id) = setup();
        let other = queries::create_user(&conn, "Other", "o@x.com", "h", Role::Admin).unwrap();
        let zone = create_zone(&mut conn, admin_id, &spec("Lot A", 12.9, 77.6, 5)).unwrap();

        let err = update_availability(&mut conn, other, zone.id, 1).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let (mut conn, admin_id) = setup();
        create_zone(&mut conn, admin_id, &spec("Central Lot", 12.9, 77.6, 5)).unwrap();

        assert_eq!(search_zones(&conn, "central").unwrap().len(), 1);
        assert_eq!(search_zones(&conn, "CENTRAL").unwrap().len(), 1);
        assert_eq!(search_zones(&conn, "west").unwrap().len(), 0);
    }

    #[test]
    fn test_nearby_sorted_and_inclusive_boundary() {
        let (mut conn, admin_id) = setup();
        let b = queries::create_user(&conn, "B", "b@x.com", "h", Role::Admin).unwrap();
        let c = queries::create_user(&conn, "C", "c@x.com", "h", Role::Admin).unwrap();

        // ~0 km, ~5.0 km (0.045 deg lat ≈ 5.004 km) and far away.
        create_zone(&mut conn, admin_id, &spec("Here", 12.9, 77.6, 1)).unwrap();
        create_zone(&mut conn, b, &spec("EdgeOfRadius", 12.945, 77.6, 1)).unwrap();
        create_zone(&mut conn, c, &spec("FarAway", 13.9, 77.6, 1)).unwrap();

        let within_5 = nearby_zones(&conn, 12.9, 77.6, 5.1).unwrap();
        assert_eq!(within_5.len(), 2);
        assert_eq!(within_5[0].zone.name, "Here");
        assert_eq!(within_5[1].zone.name, "EdgeOfRadius");

        // Exact boundary is inclusive.
        let edge = &within_5[1];
        let at_boundary = nearby_zones(&conn, 12.9, 77.6, edge.distance_km).unwrap();
        assert_eq!(at_boundary.len(), 2);

        let just_inside = nearby_zones(&conn, 12.9, 77.6, edge.distance_km - 1e-7).unwrap();
        assert_eq!(just_inside.len(), 1);
    }

    #[test]
    fn test_my_zone_not_found() {
        let (conn, admin_id) = setup();
        assert!(matches!(
            my_zone(&conn, admin_id).unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
