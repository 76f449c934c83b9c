use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ParkingSlot {
    pub id: i64,
    pub slot_number: String,
    pub vehicle_type: VehicleType,
    pub status: SlotStatus,
    pub price_per_hour: f64,
    pub zone_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Occupied,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Occupied => "occupied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SlotStatus::Available),
            "occupied" => Some(SlotStatus::Occupied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Bike,
    Truck,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "car",
            VehicleType::Bike => "bike",
            VehicleType::Truck => "truck",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "car" => Some(VehicleType::Car),
            "bike" => Some(VehicleType::Bike),
            "truck" => Some(VehicleType::Truck),
            _ => None,
        }
    }
}
