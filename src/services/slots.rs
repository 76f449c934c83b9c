use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{ParkingSlot, SlotStatus, VehicleType};
use crate::services::round2;
use crate::services::zones::owned_zone;

pub struct SlotSpec {
    pub slot_number: String,
    pub vehicle_type: VehicleType,
    pub price_per_hour: f64,
}

/// New slots start available. The zone's cached `available_slots` is left
/// untouched; the counter tracks consumption against `total_slots`, not the
/// size of the slot grid (see DESIGN.md).
pub fn create_slot(
    conn: &mut Connection,
    admin_id: i64,
    zone_id: i64,
    spec: &SlotSpec,
) -> Result<ParkingSlot, AppError> {
    let tx = conn.transaction()?;

    owned_zone(&tx, admin_id, zone_id)?;
    if queries::slot_number_exists(&tx, zone_id, &spec.slot_number)? {
        return Err(AppError::Conflict(format!(
            "slot {} already exists",
            spec.slot_number
        )));
    }

    let slot_id = queries::insert_slot(
        &tx,
        zone_id,
        &spec.slot_number,
        spec.vehicle_type,
        spec.price_per_hour,
    )?;
    let slot = queries::get_slot(&tx, slot_id)?
        .ok_or_else(|| AppError::NotFound("slot not found".to_string()))?;

    tx.commit()?;
    Ok(slot)
}

pub fn list_slots(
    conn: &Connection,
    admin_id: i64,
    zone_id: i64,
    vehicle_type: Option<VehicleType>,
    status: Option<SlotStatus>,
) -> Result<Vec<ParkingSlot>, AppError> {
    owned_zone(conn, admin_id, zone_id)?;
    Ok(queries::list_slots(conn, zone_id, vehicle_type, status)?)
}

#[derive(Debug, Serialize)]
pub struct SlotStatusChange {
    pub slot_number: String,
    pub old_status: SlotStatus,
    pub new_status: SlotStatus,
    pub zone_available_slots: i64,
    pub zone_total_slots: i64,
    pub changed: bool,
}

/// Flips a slot between available/occupied and keeps the zone counter in
/// sync. Same-status calls are a no-op. Counter updates saturate at 0 and
/// total_slots instead of erroring.
pub fn update_slot_status(
    conn: &mut Connection,
    admin_id: i64,
    zone_id: i64,
    slot_id: i64,
    new_status: SlotStatus,
) -> Result<SlotStatusChange, AppError> {
    let tx = conn.transaction()?;

    let zone = owned_zone(&tx, admin_id, zone_id)?;
    let slot = queries::get_slot_in_zone(&tx, slot_id, zone_id)?
        .ok_or_else(|| AppError::NotFound("slot not found in this zone".to_string()))?;

    if slot.status == new_status {
        return Ok(SlotStatusChange {
            slot_number: slot.slot_number,
            old_status: slot.status,
            new_status,
            zone_available_slots: zone.available_slots,
            zone_total_slots: zone.total_slots,
            changed: false,
        });
    }

    queries::set_slot_status(&tx, slot_id, new_status)?;
    match new_status {
        SlotStatus::Occupied => queries::decrement_zone_availability(&tx, zone_id)?,
        SlotStatus::Available => queries::increment_zone_availability(&tx, zone_id)?,
    }

    let updated_zone = queries::get_zone(&tx, zone_id)?
        .ok_or_else(|| AppError::NotFound("zone not found".to_string()))?;
    tx.commit()?;

    Ok(SlotStatusChange {
        slot_number: slot.slot_number,
        old_status: slot.status,
        new_status,
        zone_available_slots: updated_zone.available_slots,
        zone_total_slots: updated_zone.total_slots,
        changed: true,
    })
}

#[derive(Debug, Serialize)]
pub struct SlotDeletion {
    pub deleted_slot: i64,
    pub zone_total_slots: i64,
    pub zone_available_slots: i64,
}

/// Removing a slot shrinks total_slots, so the zone's capacity tracks the
/// current grid rather than a historical maximum.
pub fn delete_slot(
    conn: &mut Connection,
    admin_id: i64,
    zone_id: i64,
    slot_id: i64,
) -> Result<SlotDeletion, AppError> {
    let tx = conn.transaction()?;

    owned_zone(&tx, admin_id, zone_id)?;
    let slot = queries::get_slot_in_zone(&tx, slot_id, zone_id)?
        .ok_or_else(|| AppError::NotFound("slot not found in this zone".to_string()))?;

    if queries::slot_has_active_booking(&tx, slot_id)? {
        return Err(AppError::Conflict(
            "cannot delete slot with active booking".to_string(),
        ));
    }

    queries::delete_slot(&tx, slot_id)?;
    queries::shrink_zone_for_deleted_slot(&tx, zone_id, slot.status == SlotStatus::Available)?;

    let zone = queries::get_zone(&tx, zone_id)?
        .ok_or_else(|| AppError::NotFound("zone not found".to_string()))?;
    tx.commit()?;

    Ok(SlotDeletion {
        deleted_slot: slot_id,
        zone_total_slots: zone.total_slots,
        zone_available_slots: zone.available_slots,
    })
}

#[derive(Debug, Serialize)]
pub struct VehicleTypeCounts {
    pub car: i64,
    pub bike: i64,
    pub truck: i64,
}

#[derive(Debug, Serialize)]
pub struct SlotStatistics {
    pub zone_id: i64,
    pub zone_name: String,
    pub total_slots: i64,
    pub available_slots: i64,
    pub occupied_slots: i64,
    pub occupancy_rate: f64,
    pub vehicle_types: VehicleTypeCounts,
}

/// Counts come from the slot table itself, not the cached zone counter.
pub fn slot_statistics(
    conn: &Connection,
    admin_id: i64,
    zone_id: i64,
) -> Result<SlotStatistics, AppError> {
    let zone = owned_zone(conn, admin_id, zone_id)?;

    let total = queries::count_slots(conn, zone_id)?;
    let available = queries::count_slots_where(conn, zone_id, "status", "available")?;
    let occupied = queries::count_slots_where(conn, zone_id, "status", "occupied")?;

    let occupancy_rate = if total > 0 {
        round2(occupied as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    Ok(SlotStatistics {
        zone_id,
        zone_name: zone.name,
        total_slots: total,
        available_slots: available,
        occupied_slots: occupied,
        occupancy_rate,
        vehicle_types: VehicleTypeCounts {
            car: queries::count_slots_where(conn, zone_id, "vehicle_type", "car")?,
            bike: queries::count_slots_where(conn, zone_id, "vehicle_type", "bike")?,
            truck: queries::count_slots_where(conn, zone_id, "vehicle_type", "truck")?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Role;
    use crate::services::zones::{create_zone, ZoneSpec};

    fn setup() -> (Connection, i64, i64) {
        let mut conn = db::init_db(":memory:").unwrap();
        let admin_id = queries::create_user(&conn, "Admin", "a@x.com", "h", Role::Admin).unwrap();
        let zone = create_zone(
            &mut conn,
            admin_id,
            &ZoneSpec {
                name: "Lot A".to_string(),
                latitude: 12.9,
                longitude: 77.6,
                total_slots: 2,
            },
        )
        .unwrap();
        (conn, admin_id, zone.id)
    }

    fn car_slot(number: &str) -> SlotSpec {
        SlotSpec {
            slot_number: number.to_string(),
            vehicle_type: VehicleType::Car,
            price_per_hour: 20.0,
        }
    }

    #[test]
    fn test_create_slot_does_not_touch_counter() {
        let (mut conn, admin_id, zone_id) = setup();
        create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();

        let zone = queries::get_zone(&conn, zone_id).unwrap().unwrap();
        assert_eq!(zone.available_slots, 2);
        assert_eq!(zone.total_slots, 2);
    }

    #[test]
    fn test_duplicate_slot_number_rejected() {
        let (mut conn, admin_id, zone_id) = setup();
        create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();
        let err = create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_status_noop_keeps_counter() {
        let (mut conn, admin_id, zone_id) = setup();
        let slot = create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();

        let change =
            update_slot_status(&mut conn, admin_id, zone_id, slot.id, SlotStatus::Available)
                .unwrap();
        assert!(!change.changed);
        assert_eq!(change.zone_available_slots, 2);
    }

    #[test]
    fn test_status_transitions_sync_counter() {
        let (mut conn, admin_id, zone_id) = setup();
        let slot = create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();

        let change =
            update_slot_status(&mut conn, admin_id, zone_id, slot.id, SlotStatus::Occupied)
                .unwrap();
        assert_eq!(change.zone_available_slots, 1);

        let change =
            update_slot_status(&mut conn, admin_id, zone_id, slot.id, SlotStatus::Available)
                .unwrap();
        assert_eq!(change.zone_available_slots, 2);
    }

    #[test]
    fn test_counter_clamps_at_total() {
        let (mut conn, admin_id, zone_id) = setup();
        let slot = create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();

        // Counter already at total; freeing an occupied slot may not exceed it.
        update_slot_status(&mut conn, admin_id, zone_id, slot.id, SlotStatus::Occupied).unwrap();
        queries::set_available_slots(&conn, zone_id, 2).unwrap();
        let change =
            update_slot_status(&mut conn, admin_id, zone_id, slot.id, SlotStatus::Available)
                .unwrap();
        assert_eq!(change.zone_available_slots, 2);
    }

    #[test]
    fn test_counter_clamps_at_zero() {
        let (mut conn, admin_id, zone_id) = setup();
        let slot = create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();

        queries::set_available_slots(&conn, zone_id, 0).unwrap();
        let change =
            update_slot_status(&mut conn, admin_id, zone_id, slot.id, SlotStatus::Occupied)
                .unwrap();
        assert_eq!(change.zone_available_slots, 0);
    }

    #[test]
    fn test_delete_available_slot_shrinks_both_counts() {
        let (mut conn, admin_id, zone_id) = setup();
        let slot = create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();

        let deletion = delete_slot(&mut conn, admin_id, zone_id, slot.id).unwrap();
        assert_eq!(deletion.zone_total_slots, 1);
        assert_eq!(deletion.zone_available_slots, 1);
    }

    #[test]
    fn test_delete_occupied_slot_keeps_available_count() {
        let (mut conn, admin_id, zone_id) = setup();
        let slot = create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();
        update_slot_status(&mut conn, admin_id, zone_id, slot.id, SlotStatus::Occupied).unwrap();

        let deletion = delete_slot(&mut conn, admin_id, zone_id, slot.id).unwrap();
        assert_eq!(deletion.zone_total_slots, 1);
        assert_eq!(deletion.zone_available_slots, 1);
    }

    #[test]
    fn test_list_slots_ordered_and_filtered() {
        let (mut conn, admin_id, zone_id) = setup();
        create_slot(&mut conn, admin_id, zone_id, &car_slot("B2")).unwrap();
        create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();
        create_slot(
            &mut conn,
            admin_id,
            zone_id,
            &SlotSpec {
                slot_number: "C3".to_string(),
                vehicle_type: VehicleType::Bike,
                price_per_hour: 5.0,
            },
        )
        .unwrap();

        let all = list_slots(&conn, admin_id, zone_id, None, None).unwrap();
        let numbers: Vec<_> = all.iter().map(|s| s.slot_number.as_str()).collect();
        assert_eq!(numbers, vec!["A1", "B2", "C3"]);

        let bikes = list_slots(&conn, admin_id, zone_id, Some(VehicleType::Bike), None).unwrap();
        assert_eq!(bikes.len(), 1);
        assert_eq!(bikes[0].slot_number, "C3");
    }

    #[test]
    fn test_slot_statistics() {
        let (mut conn, admin_id, zone_id) = setup();
        let a1 = create_slot(&mut conn, admin_id, zone_id, &car_slot("A1")).unwrap();
        create_slot(&mut conn, admin_id, zone_id, &car_slot("A2")).unwrap();
        update_slot_status(&mut conn, admin_id, zone_id, a1.id, SlotStatus::Occupied).unwrap();

        let stats = slot_statistics(&conn, admin_id, zone_id).unwrap();
        assert_eq!(stats.total_slots, 2);
        assert_eq!(stats.available_slots, 1);
        assert_eq!(stats.occupied_slots, 1);
        assert_eq!(stats.occupancy_rate, 50.0);
        assert_eq!(stats.vehicle_types.car, 2);
    }

    #[test]
    fn test_slot_statistics_empty_zone() {
        let (conn, admin_id, zone_id) = setup();
        let stats = slot_statistics(&conn, admin_id, zone_id).unwrap();
        assert_eq!(stats.occupancy_rate, 0.0);
    }
}
