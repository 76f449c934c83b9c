use serde::Serialize;

/// A managed parking area. `available_slots` is a cached counter kept in
/// step with bookings and manual slot status flips; it is not recomputed
/// from the slot table on read.
#[derive(Debug, Clone, Serialize)]
pub struct ParkingZone {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_slots: i64,
    pub available_slots: i64,
    pub admin_id: i64,
}
