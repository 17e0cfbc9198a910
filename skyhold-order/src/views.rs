use serde::Serialize;
use skyhold_core::{Booking, BookingStatus, Payment, SeatClass};
use uuid::Uuid;

/// Booking as presented to its viewers, with its payment attached
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub flight_number: String,
    pub payment: Option<Payment>,
}

/// Payment as presented to its viewers, with the booking it settles
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    pub flight_id: Uuid,
    pub flight_number: String,
    pub traveler_id: Uuid,
    pub seat_class: SeatClass,
    pub seat_count: u32,
    pub booking_status: BookingStatus,
}

impl PaymentView {
    pub fn new(payment: Payment, booking: &Booking, flight_number: String) -> Self {
        Self {
            payment,
            flight_id: booking.flight_id,
            flight_number,
            traveler_id: booking.traveler_id,
            seat_class: booking.seat_class,
            seat_count: booking.seat_count,
            booking_status: booking.status,
        }
    }
}
