pub mod auth;
pub mod bookings;
pub mod health;
pub mod slots;
pub mod stats;
pub mod zones;
