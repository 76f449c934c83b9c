use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::bookings::EnrichedBooking;
use crate::services::round2;

#[derive(Debug, Serialize)]
pub struct DriverStats {
    pub total_bookings: i64,
    pub active_bookings: i64,
    pub completed_bookings: i64,
    pub cancelled_bookings: i64,
    pub total_amount_spent: f64,
    pub total_hours_parked: i64,
}

pub fn driver_stats(conn: &Connection, driver_id: i64) -> Result<DriverStats, AppError> {
    let total = queries::count_bookings_where(conn, "user_id", driver_id, None)?;
    let active =
        queries::count_bookings_where(conn, "user_id", driver_id, Some(BookingStatus::Active))?;
    let completed =
        queries::count_bookings_where(conn, "user_id", driver_id, Some(BookingStatus::Completed))?;
    let cancelled =
        queries::count_bookings_where(conn, "user_id", driver_id, Some(BookingStatus::Cancelled))?;
    let (total_amount, total_hours) = queries::sum_bookings_where(conn, "user_id", driver_id)?;

    Ok(DriverStats {
        total_bookings: total,
        active_bookings: active,
        completed_bookings: completed,
        cancelled_bookings: cancelled,
        total_amount_spent: round2(total_amount),
        total_hours_parked: total_hours,
    })
}

/// Bookings in the calling admin's zone, newest first, slot numbers attached
/// at read time.
pub fn zone_bookings(
    conn: &Connection,
    admin_id: i64,
    status: Option<BookingStatus>,
    limit: i64,
    skip: i64,
) -> Result<Vec<EnrichedBooking>, AppError> {
    let zone = queries::get_zone_by_admin(conn, admin_id)?
        .ok_or_else(|| AppError::NotFound("you don't manage any parking zone".to_string()))?;

    let bookings = queries::list_bookings_for_zone(conn, zone.id, status, limit, skip)?;

    let mut entries = Vec::with_capacity(bookings.len());
    for booking in bookings {
        let slot_number = queries::get_slot_number(conn, booking.slot_id)?;
        entries.push(EnrichedBooking {
            id: booking.id,
            user_id: booking.user_id,
            zone_id: booking.zone_id,
            slot_id: booking.slot_id,
            start_time: booking.start_time,
            end_time: booking.end_time,
            duration_hours: booking.duration_hours,
            amount_paid: booking.amount_paid,
            status: booking.status,
            zone_name: Some(zone.name.clone()),
            slot_number,
        });
    }
    Ok(entries)
}

#[derive(Debug, Serialize)]
pub struct ZoneBookingStats {
    pub zone_id: i64,
    pub zone_name: String,
    pub total_bookings: i64,
    pub active_bookings: i64,
    pub completed_bookings: i64,
    pub total_revenue: f64,
    pub average_booking_duration_hours: f64,
    pub current_occupancy: String,
}

pub fn zone_booking_stats(conn: &Connection, admin_id: i64) -> Result<ZoneBookingStats, AppError> {
    let zone = queries::get_zone_by_admin(conn, admin_id)?
        .ok_or_else(|| AppError::NotFound("you don't manage any parking zone".to_string()))?;

    let total = queries::count_bookings_where(conn, "zone_id", zone.id, None)?;
    let active =
        queries::count_bookings_where(conn, "zone_id", zone.id, Some(BookingStatus::Active))?;
    let completed =
        queries::count_bookings_where(conn, "zone_id", zone.id, Some(BookingStatus::Completed))?;
    let (total_revenue, total_hours) = queries::sum_bookings_where(conn, "zone_id", zone.id)?;

    let avg_duration = if total > 0 {
        round2(total_hours as f64 / total as f64)
    } else {
        0.0
    };
    let used = zone.total_slots - zone.available_slots;

    Ok(ZoneBookingStats {
        zone_id: zone.id,
        zone_name: zone.name,
        total_bookings: total,
        active_bookings: active,
        completed_bookings: completed,
        total_revenue: round2(total_revenue),
        average_booking_duration_hours: avg_duration,
        current_occupancy: format!("{used}/{}", zone.total_slots),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Role, VehicleType};
    use crate::services::bookings::{
        cancel_booking, complete_booking, create_booking, extend_booking, BookingRequest,
    };
    use crate::services::slots::{create_slot, SlotSpec};
    use crate::services::zones::{create_zone, ZoneSpec};

    fn setup() -> (Connection, i64, i64, i64) {
        let mut conn = db::init_db(":memory:").unwrap();
        let admin_id = queries::create_user(&conn, "Admin", "a@x.com", "h", Role::Admin).unwrap();
        let driver_id =
            queries::create_user(&conn, "Driver", "d@x.com", "h", Role::Driver).unwrap();
        let zone = create_zone(
            &mut conn,
            admin_id,
            &ZoneSpec {
                name: "Lot A".to_string(),
                latitude: 12.9,
                longitude: 77.6,
                total_slots: 3,
            },
        )
        .unwrap();
        for n in ["A1", "A2", "A3"] {
            create_slot(
                &mut conn,
                admin_id,
                zone.id,
                &SlotSpec {
                    slot_number: n.to_string(),
                    vehicle_type: VehicleType::Car,
                    price_per_hour: 10.0,
                },
            )
            .unwrap();
        }
        (conn, admin_id, driver_id, zone.id)
    }

    fn book(conn: &mut Connection, driver_id: i64, zone_id: i64, hours: i64) -> i64 {
        create_booking(
            conn,
            driver_id,
            &BookingRequest {
                zone_id,
                slot_id: None,
                duration_hours: hours,
            },
        )
        .unwrap()
        .booking_id
    }

    #[test]
    fn test_driver_stats_rollup() {
        let (mut conn, _, driver_id, zone_id) = setup();

        let b1 = book(&mut conn, driver_id, zone_id, 2); // 20.0
        complete_booking(&mut conn, driver_id, b1).unwrap();
        let b2 = book(&mut conn, driver_id, zone_id, 1); // 10.0
        cancel_booking(&mut conn, driver_id, b2).unwrap();
        book(&mut conn, driver_id, zone_id, 4); // 40.0, still active

        let stats = driver_stats(&conn, driver_id).unwrap();
        assert_eq!(stats.total_bookings, 3);
        assert_eq!(stats.active_bookings, 1);
        assert_eq!(stats.completed_bookings, 1);
        assert_eq!(stats.cancelled_bookings, 1);
        assert_eq!(stats.total_amount_spent, 70.0);
        assert_eq!(stats.total_hours_parked, 7);
    }

    #[test]
    fn test_driver_stats_empty() {
        let (conn, _, driver_id, _) = setup();
        let stats = driver_stats(&conn, driver_id).unwrap();
        assert_eq!(stats.total_bookings, 0);
        assert_eq!(stats.total_amount_spent, 0.0);
    }

    #[test]
    fn test_zone_booking_stats() {
        let (mut conn, admin_id, driver_id, zone_id) = setup();

        let b1 = book(&mut conn, driver_id, zone_id, 2);
        extend_booking(&mut conn, driver_id, b1, 2).unwrap(); // 40.0 total, 4h
        complete_booking(&mut conn, driver_id, b1).unwrap();
        book(&mut conn, driver_id, zone_id, 2); // active, 20.0

        let stats = zone_booking_stats(&conn, admin_id).unwrap();
        assert_eq!(stats.total_bookings, 2);
        assert_eq!(stats.active_bookings, 1);
        assert_eq!(stats.completed_bookings, 1);
        assert_eq!(stats.total_revenue, 60.0);
        assert_eq!(stats.average_booking_duration_hours, 3.0);
        assert_eq!(stats.current_occupancy, "1/3");
    }

    #[test]
    fn test_zone_stats_requires_zone() {
        let (conn, _, driver_id, _) = setup();
        // A user with no zone (the driver id doubles as a zoneless admin id here).
        let err = zone_booking_stats(&conn, driver_id).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_zone_bookings_listing() {
        let (mut conn, admin_id, driver_id, zone_id) = setup();
        let b1 = book(&mut conn, driver_id, zone_id, 1);
        complete_booking(&mut conn, driver_id, b1).unwrap();
        let b2 = book(&mut conn, driver_id, zone_id, 1);

        let all = zone_bookings(&conn, admin_id, None, 20, 0).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, b2);
        assert_eq!(all[0].zone_name.as_deref(), Some("Lot A"));
        assert!(all[0].slot_number.is_some());

        let active =
            zone_bookings(&conn, admin_id, Some(BookingStatus::Active), 20, 0).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b2);
    }
}
