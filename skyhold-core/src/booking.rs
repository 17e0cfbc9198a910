use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skyhold_shared::Money;
use std::fmt;
use uuid::Uuid;

use crate::flight::SeatClass;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Pending and Confirmed bookings hold seats against their flight
    pub fn is_seat_holding(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Pending -> {Confirmed, Cancelled}, Confirmed -> Cancelled, Cancelled is terminal
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(BookingStatus::Pending),
            "Confirmed" => Some(BookingStatus::Confirmed),
            "Cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub traveler_id: Uuid,
    pub seat_class: SeatClass,
    pub seat_count: u32,
    pub total_price: Money,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        flight_id: Uuid,
        traveler_id: Uuid,
        seat_class: SeatClass,
        seat_count: u32,
        total_price: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            flight_id,
            traveler_id,
            seat_class,
            seat_count,
            total_price,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
