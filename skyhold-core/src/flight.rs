use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skyhold_shared::Money;
use std::fmt;
use uuid::Uuid;

/// Fare tier sold on a flight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeatClass {
    Economy,
    Business,
    FirstClass,
}

impl SeatClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Economy => "Economy",
            SeatClass::Business => "Business",
            SeatClass::FirstClass => "FirstClass",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Economy" => Some(SeatClass::Economy),
            "Business" => Some(SeatClass::Business),
            "FirstClass" => Some(SeatClass::FirstClass),
            _ => None,
        }
    }
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatClassOffer {
    pub class: SeatClass,
    pub price: Money,
    #[serde(default = "offer_active")]
    pub active: bool,
}

fn offer_active() -> bool {
    true
}

impl SeatClassOffer {
    pub fn new(class: SeatClass, price: Money) -> Self {
        Self { class, price, active: true }
    }
}

/// A scheduled flight and its seat counters.
///
/// `remaining_seats` is owned by the inventory: nothing outside the flight
/// repository's atomic primitives may write it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub airline_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub capacity: u32,
    pub remaining_seats: u32,
    pub offers: Vec<SeatClassOffer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flight {
    pub fn offer(&self, class: SeatClass) -> Option<&SeatClassOffer> {
        self.offers.iter().find(|o| o.class == class)
    }

    pub fn active_offers(&self) -> impl Iterator<Item = &SeatClassOffer> {
        self.offers.iter().filter(|o| o.active)
    }

    pub fn has_active_offer(&self) -> bool {
        self.offers.iter().any(|o| o.active)
    }

    /// Seats committed to Pending or Confirmed bookings
    pub fn sold_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.remaining_seats)
    }
}
