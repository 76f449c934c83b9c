use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingStatus, ParkingSlot, ParkingZone, Role, SlotStatus, User, VehicleType,
};

const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FORMAT).to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DT_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Users ──

pub fn create_user(
    conn: &Connection,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
        params![name, email, password_hash, role.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let result = conn
        .query_row(
            "SELECT id, name, email, password_hash, role FROM users WHERE email = ?1",
            params![email],
            parse_user_row,
        )
        .optional()?;
    Ok(result)
}

pub fn get_user_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<User>> {
    let result = conn
        .query_row(
            "SELECT id, name, email, password_hash, role FROM users WHERE id = ?1",
            params![id],
            parse_user_row,
        )
        .optional()?;
    Ok(result)
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let role_str: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::parse(&role_str).unwrap_or(Role::Driver),
    })
}

// ── Zones ──

const ZONE_COLS: &str = "id, name, latitude, longitude, total_slots, available_slots, admin_id";

pub fn insert_zone(
    conn: &Connection,
    name: &str,
    latitude: f64,
    longitude: f64,
    total_slots: i64,
    admin_id: i64,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO parking_zones (name, latitude, longitude, total_slots, available_slots, admin_id)
         VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
        params![name, latitude, longitude, total_slots, admin_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_zone(conn: &Connection, id: i64) -> anyhow::Result<Option<ParkingZone>> {
    let result = conn
        .query_row(
            &format!("SELECT {ZONE_COLS} FROM parking_zones WHERE id = ?1"),
            params![id],
            parse_zone_row,
        )
        .optional()?;
    Ok(result)
}

pub fn get_zone_by_admin(conn: &Connection, admin_id: i64) -> anyhow::Result<Option<ParkingZone>> {
    let result = conn
        .query_row(
            &format!("SELECT {ZONE_COLS} FROM parking_zones WHERE admin_id = ?1"),
            params![admin_id],
            parse_zone_row,
        )
        .optional()?;
    Ok(result)
}

pub fn list_zones(conn: &Connection) -> anyhow::Result<Vec<ParkingZone>> {
    let mut stmt = conn.prepare(&format!("SELECT {ZONE_COLS} FROM parking_zones ORDER BY id ASC"))?;
    let rows = stmt.query_map([], parse_zone_row)?;

    let mut zones = vec![];
    for row in rows {
        zones.push(row?);
    }
    Ok(zones)
}

pub fn search_zones(conn: &Connection, name: &str) -> anyhow::Result<Vec<ParkingZone>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ZONE_COLS} FROM parking_zones WHERE name LIKE ?1 COLLATE NOCASE ORDER BY id ASC"
    ))?;
    let pattern = format!("%{name}%");
    let rows = stmt.query_map(params![pattern], parse_zone_row)?;

    let mut zones = vec![];
    for row in rows {
        zones.push(row?);
    }
    Ok(zones)
}

pub fn set_available_slots(conn: &Connection, zone_id: i64, value: i64) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE parking_zones SET available_slots = ?1 WHERE id = ?2",
        params![value, zone_id],
    )?;
    Ok(())
}

/// Saturating decrement: never drops below zero.
pub fn decrement_zone_availability(conn: &Connection, zone_id: i64) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE parking_zones SET available_slots = MAX(available_slots - 1, 0) WHERE id = ?1",
        params![zone_id],
    )?;
    Ok(())
}

/// Saturating increment: never exceeds total_slots.
pub fn increment_zone_availability(conn: &Connection, zone_id: i64) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE parking_zones SET available_slots = MIN(available_slots + 1, total_slots) WHERE id = ?1",
        params![zone_id],
    )?;
    Ok(())
}

/// Shrinks a zone after a slot deletion: total_slots always drops by one,
/// available_slots only if the deleted slot was still available (clamped at 0).
pub fn shrink_zone_for_deleted_slot(
    conn: &Connection,
    zone_id: i64,
    was_available: bool,
) -> anyhow::Result<()> {
    if was_available {
        conn.execute(
            "UPDATE parking_zones
             SET available_slots = MAX(available_slots - 1, 0), total_slots = total_slots - 1
             WHERE id = ?1",
            params![zone_id],
        )?;
    } else {
        conn.execute(
            "UPDATE parking_zones SET total_slots = total_slots - 1 WHERE id = ?1",
            params![zone_id],
        )?;
    }
    Ok(())
}

fn parse_zone_row(row: &rusqlite::Row) -> rusqlite::Result<ParkingZone> {
    Ok(ParkingZone {
        id: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        total_slots: row.get(4)?,
        available_slots: row.get(5)?,
        admin_id: row.get(6)?,
    })
}

// ── Slots ──

const SLOT_COLS: &str = "id, slot_number, vehicle_type, status, price_per_hour, zone_id";

pub fn insert_slot(
    conn: &Connection,
    zone_id: i64,
    slot_number: &str,
    vehicle_type: VehicleType,
    price_per_hour: f64,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO parking_slots (slot_number, vehicle_type, status, price_per_hour, zone_id)
         VALUES (?1, ?2, 'available', ?3, ?4)",
        params![slot_number, vehicle_type.as_str(), price_per_hour, zone_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_slot(conn: &Connection, id: i64) -> anyhow::Result<Option<ParkingSlot>> {
    let result = conn
        .query_row(
            &format!("SELECT {SLOT_COLS} FROM parking_slots WHERE id = ?1"),
            params![id],
            parse_slot_row,
        )
        .optional()?;
    Ok(result)
}

pub fn get_slot_in_zone(
    conn: &Connection,
    slot_id: i64,
    zone_id: i64,
) -> anyhow::Result<Option<ParkingSlot>> {
    let result = conn
        .query_row(
            &format!("SELECT {SLOT_COLS} FROM parking_slots WHERE id = ?1 AND zone_id = ?2"),
            params![slot_id, zone_id],
            parse_slot_row,
        )
        .optional()?;
    Ok(result)
}

pub fn slot_number_exists(conn: &Connection, zone_id: i64, slot_number: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM parking_slots WHERE zone_id = ?1 AND slot_number = ?2",
        params![zone_id, slot_number],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_slots(
    conn: &Connection,
    zone_id: i64,
    vehicle_type: Option<VehicleType>,
    status: Option<SlotStatus>,
) -> anyhow::Result<Vec<ParkingSlot>> {
    let mut sql = format!("SELECT {SLOT_COLS} FROM parking_slots WHERE zone_id = ?1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(zone_id)];

    if let Some(vt) = vehicle_type {
        params_vec.push(Box::new(vt.as_str().to_string()));
        sql.push_str(&format!(" AND vehicle_type = ?{}", params_vec.len()));
    }
    if let Some(st) = status {
        params_vec.push(Box::new(st.as_str().to_string()));
        sql.push_str(&format!(" AND status = ?{}", params_vec.len()));
    }
    sql.push_str(" ORDER BY slot_number ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_slot_row)?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

/// First available slot by insertion order; the auto-assignment policy for
/// bookings that do not name a slot.
pub fn first_available_slot(conn: &Connection, zone_id: i64) -> anyhow::Result<Option<ParkingSlot>> {
    let result = conn
        .query_row(
            &format!(
                "SELECT {SLOT_COLS} FROM parking_slots
                 WHERE zone_id = ?1 AND status = 'available' ORDER BY id ASC LIMIT 1"
            ),
            params![zone_id],
            parse_slot_row,
        )
        .optional()?;
    Ok(result)
}

pub fn set_slot_status(conn: &Connection, slot_id: i64, status: SlotStatus) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE parking_slots SET status = ?1 WHERE id = ?2",
        params![status.as_str(), slot_id],
    )?;
    Ok(())
}

pub fn delete_slot(conn: &Connection, slot_id: i64) -> anyhow::Result<()> {
    conn.execute("DELETE FROM parking_slots WHERE id = ?1", params![slot_id])?;
    Ok(())
}

pub fn slot_has_active_booking(conn: &Connection, slot_id: i64) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE slot_id = ?1 AND status = 'active'",
        params![slot_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn count_slots_where(conn: &Connection, zone_id: i64, column: &str, value: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM parking_slots WHERE zone_id = ?1 AND {column} = ?2"),
        params![zone_id, value],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_slots(conn: &Connection, zone_id: i64) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM parking_slots WHERE zone_id = ?1",
        params![zone_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_slot_row(row: &rusqlite::Row) -> rusqlite::Result<ParkingSlot> {
    let vehicle_type_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    Ok(ParkingSlot {
        id: row.get(0)?,
        slot_number: row.get(1)?,
        vehicle_type: VehicleType::parse(&vehicle_type_str).unwrap_or(VehicleType::Car),
        status: SlotStatus::parse(&status_str).unwrap_or(SlotStatus::Available),
        price_per_hour: row.get(4)?,
        zone_id: row.get(5)?,
    })
}

// ── Bookings ──

const BOOKING_COLS: &str =
    "id, user_id, slot_id, zone_id, start_time, end_time, duration_hours, amount_paid, status";

#[allow(clippy::too_many_arguments)]
pub fn insert_booking(
    conn: &Connection,
    user_id: i64,
    slot_id: i64,
    zone_id: i64,
    start_time: &NaiveDateTime,
    end_time: &NaiveDateTime,
    duration_hours: i64,
    amount_paid: f64,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO bookings (user_id, slot_id, zone_id, start_time, end_time, duration_hours, amount_paid, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'active')",
        params![
            user_id,
            slot_id,
            zone_id,
            fmt_dt(start_time),
            fmt_dt(end_time),
            duration_hours,
            amount_paid,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_booking_for_user(
    conn: &Connection,
    booking_id: i64,
    user_id: i64,
) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = ?1 AND user_id = ?2"),
            params![booking_id, user_id],
            parse_booking_row,
        )
        .optional()?;
    Ok(result)
}

pub fn get_active_booking_for_user(conn: &Connection, user_id: i64) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLS} FROM bookings WHERE user_id = ?1 AND status = 'active'"),
            params![user_id],
            parse_booking_row,
        )
        .optional()?;
    Ok(result)
}

pub fn extend_booking_row(
    conn: &Connection,
    booking_id: i64,
    new_end_time: &NaiveDateTime,
    new_duration_hours: i64,
    new_amount_paid: f64,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE bookings SET end_time = ?1, duration_hours = ?2, amount_paid = ?3 WHERE id = ?4",
        params![fmt_dt(new_end_time), new_duration_hours, new_amount_paid, booking_id],
    )?;
    Ok(())
}

/// Moves a booking into a terminal state. `end_time` is only overwritten on
/// completion (actual checkout time); cancellation keeps the scheduled one.
pub fn finish_booking(
    conn: &Connection,
    booking_id: i64,
    status: BookingStatus,
    end_time: Option<&NaiveDateTime>,
) -> anyhow::Result<()> {
    match end_time {
        Some(end) => conn.execute(
            "UPDATE bookings SET status = ?1, end_time = ?2 WHERE id = ?3",
            params![status.as_str(), fmt_dt(end), booking_id],
        )?,
        None => conn.execute(
            "UPDATE bookings SET status = ?1 WHERE id = ?2",
            params![status.as_str(), booking_id],
        )?,
    };
    Ok(())
}

pub fn list_bookings_for_user(
    conn: &Connection,
    user_id: i64,
    status: Option<BookingStatus>,
    limit: i64,
    skip: i64,
) -> anyhow::Result<Vec<Booking>> {
    list_bookings_by(conn, "user_id", user_id, status, limit, skip)
}

pub fn list_bookings_for_zone(
    conn: &Connection,
    zone_id: i64,
    status: Option<BookingStatus>,
    limit: i64,
    skip: i64,
) -> anyhow::Result<Vec<Booking>> {
    list_bookings_by(conn, "zone_id", zone_id, status, limit, skip)
}

fn list_bookings_by(
    conn: &Connection,
    column: &str,
    key: i64,
    status: Option<BookingStatus>,
    limit: i64,
    skip: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status {
        Some(st) => (
            format!(
                "SELECT {BOOKING_COLS} FROM bookings WHERE {column} = ?1 AND status = ?2
                 ORDER BY id DESC LIMIT ?3 OFFSET ?4"
            ),
            vec![
                Box::new(key) as Box<dyn rusqlite::types::ToSql>,
                Box::new(st.as_str().to_string()),
                Box::new(limit),
                Box::new(skip),
            ],
        ),
        None => (
            format!(
                "SELECT {BOOKING_COLS} FROM bookings WHERE {column} = ?1
                 ORDER BY id DESC LIMIT ?2 OFFSET ?3"
            ),
            vec![
                Box::new(key) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
                Box::new(skip),
            ],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn count_bookings_where(
    conn: &Connection,
    column: &str,
    key: i64,
    status: Option<BookingStatus>,
) -> anyhow::Result<i64> {
    let count: i64 = match status {
        Some(st) => conn.query_row(
            &format!("SELECT COUNT(*) FROM bookings WHERE {column} = ?1 AND status = ?2"),
            params![key, st.as_str()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            &format!("SELECT COUNT(*) FROM bookings WHERE {column} = ?1"),
            params![key],
            |row| row.get(0),
        )?,
    };
    Ok(count)
}

/// Summed amount_paid and duration_hours over all of a user's or zone's bookings.
pub fn sum_bookings_where(conn: &Connection, column: &str, key: i64) -> anyhow::Result<(f64, i64)> {
    let result = conn.query_row(
        &format!(
            "SELECT COALESCE(SUM(amount_paid), 0), COALESCE(SUM(duration_hours), 0)
             FROM bookings WHERE {column} = ?1"
        ),
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(result)
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let start_time_str: String = row.get(4)?;
    let end_time_str: String = row.get(5)?;
    let status_str: String = row.get(8)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        slot_id: row.get(2)?,
        zone_id: row.get(3)?,
        start_time: parse_dt(&start_time_str),
        end_time: parse_dt(&end_time_str),
        duration_hours: row.get(6)?,
        amount_paid: row.get(7)?,
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Active),
    })
}

// ── Enrichment lookups ──

pub fn get_zone_name(conn: &Connection, zone_id: i64) -> anyhow::Result<Option<String>> {
    let result = conn
        .query_row(
            "SELECT name FROM parking_zones WHERE id = ?1",
            params![zone_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(result)
}

/// Tolerates slots deleted after the booking reached a terminal state.
pub fn get_slot_number(conn: &Connection, slot_id: Option<i64>) -> anyhow::Result<Option<String>> {
    let Some(id) = slot_id else { return Ok(None) };
    let result = conn
        .query_row(
            "SELECT slot_number FROM parking_slots WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(result)
}
