//! Randomized booking workload against an in-memory database. After every
//! operation the zone counter, slot statuses and active bookings must agree
//! with each other.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;

use parkspot::db;
use parkspot::db::queries;
use parkspot::models::{Role, SlotStatus, VehicleType};
use parkspot::services::bookings::{self, BookingRequest};
use parkspot::services::slots::{create_slot, SlotSpec};
use parkspot::services::zones::{create_zone, ZoneSpec};

const SLOTS: i64 = 4;
const DRIVERS: usize = 6;
const STEPS: usize = 500;

fn setup() -> (Connection, i64, Vec<i64>) {
    let mut conn = db::init_db(":memory:").unwrap();
    let admin_id = queries::create_user(&conn, "Admin", "a@x.com", "h", Role::Admin).unwrap();
    let zone = create_zone(
        &mut conn,
        admin_id,
        &ZoneSpec {
            name: "Lot A".to_string(),
            latitude: 12.9,
            longitude: 77.6,
            total_slots: SLOTS,
        },
    )
    .unwrap();

    for i in 0..SLOTS {
        create_slot(
            &mut conn,
            admin_id,
            zone.id,
            &SlotSpec {
                slot_number: format!("S{i}"),
                vehicle_type: VehicleType::Car,
                price_per_hour: 10.0,
            },
        )
        .unwrap();
    }

    let drivers = (0..DRIVERS)
        .map(|i| {
            queries::create_user(&conn, &format!("D{i}"), &format!("d{i}@x.com"), "h", Role::Driver)
                .unwrap()
        })
        .collect();

    (conn, zone.id, drivers)
}

fn assert_consistent(conn: &Connection, zone_id: i64, drivers: &[i64]) {
    let zone = queries::get_zone(conn, zone_id).unwrap().unwrap();
    assert!(
        zone.available_slots >= 0 && zone.available_slots <= zone.total_slots,
        "counter out of bounds: {}/{}",
        zone.available_slots,
        zone.total_slots
    );

    let available = queries::list_slots(conn, zone_id, None, Some(SlotStatus::Available))
        .unwrap()
        .len() as i64;
    assert_eq!(
        zone.available_slots, available,
        "counter disagrees with slot statuses"
    );

    let mut occupied_slots = Vec::new();
    let mut active_total = 0;
    for &driver in drivers {
        if let Some(booking) = queries::get_active_booking_for_user(conn, driver).unwrap() {
            active_total += 1;
            let slot_id = booking.slot_id.unwrap();
            assert!(
                !occupied_slots.contains(&slot_id),
                "two active bookings share slot {slot_id}"
            );
            occupied_slots.push(slot_id);

            let slot = queries::get_slot(conn, slot_id).unwrap().unwrap();
            assert_eq!(slot.status, SlotStatus::Occupied);
        }
    }
    assert_eq!(active_total, zone.total_slots - zone.available_slots);
}

#[test]
fn test_random_booking_workload_keeps_invariants() {
    let (mut conn, zone_id, drivers) = setup();
    let mut rng = StdRng::seed_from_u64(0xB00C);

    for _ in 0..STEPS {
        let driver = drivers[rng.gen_range(0..drivers.len())];

        match rng.gen_range(0..4) {
            0 => {
                let result = bookings::create_booking(
                    &mut conn,
                    driver,
                    &BookingRequest {
                        zone_id,
                        slot_id: None,
                        duration_hours: rng.gen_range(1..=24),
                    },
                );
                // Rejections (already booked, zone full) are expected; only
                // the state afterwards has to be consistent.
                let _ = result;
            }
            1 => {
                if let Some(b) = queries::get_active_booking_for_user(&conn, driver).unwrap() {
                    bookings::extend_booking(&mut conn, driver, b.id, rng.gen_range(1..=12))
                        .unwrap();
                }
            }
            2 => {
                if let Some(b) = queries::get_active_booking_for_user(&conn, driver).unwrap() {
                    bookings::complete_booking(&mut conn, driver, b.id).unwrap();
                }
            }
            _ => {
                if let Some(b) = queries::get_active_booking_for_user(&conn, driver).unwrap() {
                    bookings::cancel_booking(&mut conn, driver, b.id).unwrap();
                }
            }
        }

        assert_consistent(&conn, zone_id, &drivers);
    }
}

#[test]
fn test_workload_history_accounts_for_every_booking() {
    let (mut conn, zone_id, drivers) = setup();
    let mut rng = StdRng::seed_from_u64(7);

    let mut created = 0;
    for _ in 0..200 {
        let driver = drivers[rng.gen_range(0..drivers.len())];
        if rng.gen_bool(0.5) {
            if bookings::create_booking(
                &mut conn,
                driver,
                &BookingRequest {
                    zone_id,
                    slot_id: None,
                    duration_hours: 1,
                },
            )
            .is_ok()
            {
                created += 1;
            }
        } else if let Some(b) = queries::get_active_booking_for_user(&conn, driver).unwrap() {
            bookings::complete_booking(&mut conn, driver, b.id).unwrap();
        }
    }

    let mut seen = 0;
    for &driver in &drivers {
        seen += bookings::booking_history(&conn, driver, None, 1000, 0)
            .unwrap()
            .len();
    }
    assert_eq!(seen, created);
}
