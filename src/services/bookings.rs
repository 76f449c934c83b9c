use chrono::{Duration, NaiveDateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingStatus, SlotStatus};

pub struct BookingRequest {
    pub zone_id: i64,
    pub slot_id: Option<i64>,
    pub duration_hours: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingConfirmation {
    pub booking_id: i64,
    pub zone_name: String,
    pub slot_number: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_hours: i64,
    pub amount_paid: f64,
}

/// Books a slot for a driver. The reads, the invariant checks and all three
/// writes (booking insert, slot flip, counter decrement) happen in a single
/// transaction, so concurrent requests for the same driver or slot cannot
/// both land.
pub fn create_booking(
    conn: &mut Connection,
    driver_id: i64,
    req: &BookingRequest,
) -> Result<BookingConfirmation, AppError> {
    let tx = conn.transaction()?;

    let zone = queries::get_zone(&tx, req.zone_id)?
        .ok_or_else(|| AppError::NotFound("parking zone not found".to_string()))?;

    if queries::get_active_booking_for_user(&tx, driver_id)?.is_some() {
        return Err(AppError::Conflict(
            "you already have an active booking. complete or cancel it first".to_string(),
        ));
    }

    if zone.available_slots <= 0 {
        return Err(AppError::InvalidArgument(
            "no available slots in this parking zone".to_string(),
        ));
    }

    let slot = match req.slot_id {
        Some(slot_id) => queries::get_slot_in_zone(&tx, slot_id, zone.id)?
            .filter(|s| s.status == SlotStatus::Available)
            .ok_or_else(|| {
                AppError::InvalidArgument("requested slot is not available".to_string())
            })?,
        None => queries::first_available_slot(&tx, zone.id)?.ok_or_else(|| {
            AppError::InvalidArgument("no available slots in this zone".to_string())
        })?,
    };

    let start_time = Utc::now().naive_utc();
    let end_time = start_time + Duration::hours(req.duration_hours);
    let amount_paid = slot.price_per_hour * req.duration_hours as f64;

    let booking_id = queries::insert_booking(
        &tx,
        driver_id,
        slot.id,
        zone.id,
        &start_time,
        &end_time,
        req.duration_hours,
        amount_paid,
    )?;
    queries::set_slot_status(&tx, slot.id, SlotStatus::Occupied)?;
    queries::decrement_zone_availability(&tx, zone.id)?;

    tx.commit()?;
    tracing::info!(booking_id, driver_id, zone_id = zone.id, slot_id = slot.id, "booking created");

    Ok(BookingConfirmation {
        booking_id,
        zone_name: zone.name,
        slot_number: slot.slot_number,
        start_time,
        end_time,
        duration_hours: req.duration_hours,
        amount_paid,
    })
}

#[derive(Debug, Serialize)]
pub struct EnrichedBooking {
    pub id: i64,
    pub user_id: i64,
    pub zone_id: i64,
    pub slot_id: Option<i64>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_hours: i64,
    pub amount_paid: f64,
    pub status: BookingStatus,
    pub zone_name: Option<String>,
    pub slot_number: Option<String>,
}

pub fn active_booking(conn: &Connection, driver_id: i64) -> Result<EnrichedBooking, AppError> {
    let booking = queries::get_active_booking_for_user(conn, driver_id)?
        .ok_or_else(|| AppError::NotFound("no active booking found".to_string()))?;

    let zone_name = queries::get_zone_name(conn, booking.zone_id)?;
    let slot_number = queries::get_slot_number(conn, booking.slot_id)?;

    Ok(EnrichedBooking {
        id: booking.id,
        user_id: booking.user_id,
        zone_id: booking.zone_id,
        slot_id: booking.slot_id,
        start_time: booking.start_time,
        end_time: booking.end_time,
        duration_hours: booking.duration_hours,
        amount_paid: booking.amount_paid,
        status: booking.status,
        zone_name,
        slot_number,
    })
}

#[derive(Debug, Serialize)]
pub struct ExtensionReceipt {
    pub booking_id: i64,
    pub new_end_time: NaiveDateTime,
    pub additional_hours: i64,
    pub additional_amount: f64,
    pub total_amount: f64,
    pub total_duration: i64,
}

/// Extends an active booking. The hourly price is re-read from the slot at
/// extension time, so a price change between creation and extension bills at
/// the new rate.
pub fn extend_booking(
    conn: &mut Connection,
    driver_id: i64,
    booking_id: i64,
    additional_hours: i64,
) -> Result<ExtensionReceipt, AppError> {
    let tx = conn.transaction()?;

    let booking = queries::get_booking_for_user(&tx, booking_id, driver_id)?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    if booking.status != BookingStatus::Active {
        return Err(AppError::InvalidArgument(
            "can only extend active bookings".to_string(),
        ));
    }

    let slot = booking
        .slot_id
        .map(|id| queries::get_slot(&tx, id))
        .transpose()?
        .flatten()
        .ok_or_else(|| AppError::NotFound("slot not found".to_string()))?;

    let additional_amount = slot.price_per_hour * additional_hours as f64;
    let new_end_time = booking.end_time + Duration::hours(additional_hours);
    let new_duration = booking.duration_hours + additional_hours;
    let total_amount = booking.amount_paid + additional_amount;

    queries::extend_booking_row(&tx, booking_id, &new_end_time, new_duration, total_amount)?;
    tx.commit()?;

    Ok(ExtensionReceipt {
        booking_id,
        new_end_time,
        additional_hours,
        additional_amount,
        total_amount,
        total_duration: new_duration,
    })
}

#[derive(Debug, Serialize)]
pub struct CompletionReceipt {
    pub booking_id: i64,
    pub slot_number: Option<String>,
    pub zone_name: Option<String>,
    pub amount_paid: f64,
    pub duration_hours: i64,
}

/// Checkout. The booking keeps its originally billed amount; only end_time
/// is overwritten with the actual completion time.
pub fn complete_booking(
    conn: &mut Connection,
    driver_id: i64,
    booking_id: i64,
) -> Result<CompletionReceipt, AppError> {
    let tx = conn.transaction()?;

    let booking = release_booking(&tx, driver_id, booking_id, BookingStatus::Completed)?;

    let slot_number = queries::get_slot_number(&tx, booking.slot_id)?;
    let zone_name = queries::get_zone_name(&tx, booking.zone_id)?;
    tx.commit()?;

    Ok(CompletionReceipt {
        booking_id,
        slot_number,
        zone_name,
        amount_paid: booking.amount_paid,
        duration_hours: booking.duration_hours,
    })
}

#[derive(Debug, Serialize)]
pub struct CancellationReceipt {
    pub booking_id: i64,
    pub refund_amount: f64,
}

/// Same slot/counter side effects as completion; no refund is issued.
pub fn cancel_booking(
    conn: &mut Connection,
    driver_id: i64,
    booking_id: i64,
) -> Result<CancellationReceipt, AppError> {
    let tx = conn.transaction()?;

    release_booking(&tx, driver_id, booking_id, BookingStatus::Cancelled)?;
    tx.commit()?;

    Ok(CancellationReceipt {
        booking_id,
        refund_amount: 0.0,
    })
}

/// Shared tail of complete/cancel: move the booking to a terminal state,
/// free its slot and give the availability back to the zone (saturating at
/// total_slots). Completion also stamps the actual checkout time.
fn release_booking(
    conn: &Connection,
    driver_id: i64,
    booking_id: i64,
    terminal: BookingStatus,
) -> Result<crate::models::Booking, AppError> {
    let booking = queries::get_booking_for_user(conn, booking_id, driver_id)?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    if booking.status != BookingStatus::Active {
        return Err(AppError::InvalidArgument(
            "booking is not active".to_string(),
        ));
    }

    let end_time = (terminal == BookingStatus::Completed).then(|| Utc::now().naive_utc());
    queries::finish_booking(conn, booking_id, terminal, end_time.as_ref())?;

    if let Some(slot_id) = booking.slot_id {
        queries::set_slot_status(conn, slot_id, SlotStatus::Available)?;
    }
    queries::increment_zone_availability(conn, booking.zone_id)?;

    Ok(booking)
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub zone_id: i64,
    pub zone_name: String,
    pub slot_number: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_hours: i64,
    pub amount_paid: f64,
    pub status: BookingStatus,
}

/// Newest first. Zone and slot names are fetched at read time, so renames
/// show up retroactively and deleted slots read back as null.
pub fn booking_history(
    conn: &Connection,
    driver_id: i64,
    status: Option<BookingStatus>,
    limit: i64,
    skip: i64,
) -> Result<Vec<HistoryEntry>, AppError> {
    let bookings = queries::list_bookings_for_user(conn, driver_id, status, limit, skip)?;

    let mut entries = Vec::with_capacity(bookings.len());
    for booking in bookings {
        let zone_name = queries::get_zone_name(conn, booking.zone_id)?
            .unwrap_or_else(|| "Unknown".to_string());
        let slot_number = queries::get_slot_number(conn, booking.slot_id)?;

        entries.push(HistoryEntry {
            id: booking.id,
            zone_id: booking.zone_id,
            zone_name,
            slot_number,
            start_time: booking.start_time,
            end_time: booking.end_time,
            duration_hours: booking.duration_hours,
            amount_paid: booking.amount_paid,
            status: booking.status,
        });
    }
    Ok(entries)
}
