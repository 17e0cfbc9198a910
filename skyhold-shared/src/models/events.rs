use crate::money::Money;
use uuid::Uuid;

/// Topics the booking core publishes to
pub mod topics {
    pub const BOOKING_CREATED: &str = "booking.created";
    pub const BOOKING_CONFIRMED: &str = "booking.confirmed";
    pub const BOOKING_CANCELLED: &str = "booking.cancelled";
    pub const BOOKING_EXPIRED: &str = "booking.expired";
    pub const PAYMENT_CONFIRMED: &str = "payment.confirmed";
    pub const PAYMENT_CANCELLED: &str = "payment.cancelled";
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub payment_id: Uuid,
    pub flight_id: Uuid,
    pub traveler_id: Uuid,
    pub seat_class: String,
    pub seat_count: u32,
    pub total_price: Money,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingStatusChangedEvent {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub status: String,
    /// Seats returned to the flight by this transition (0 on confirmation)
    pub seats_released: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentSettledEvent {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub status: String,
    pub amount: Money,
    pub settled_by: Uuid,
    pub timestamp: i64,
}
