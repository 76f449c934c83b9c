pub mod auth;
pub mod bookings;
pub mod geo;
pub mod slots;
pub mod stats;
pub mod zones;

/// Money and percentage values are reported to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
