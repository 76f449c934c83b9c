pub mod booking;
pub mod slot;
pub mod user;
pub mod zone;

pub use booking::{Booking, BookingStatus};
pub use slot::{ParkingSlot, SlotStatus, VehicleType};
pub use user::{Role, User};
pub use zone::ParkingZone;
