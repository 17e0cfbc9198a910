use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skyhold_shared::Money;
use std::fmt;
use uuid::Uuid;

use crate::booking::Booking;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl PaymentStatus {
    /// Pending -> {Confirmed, Cancelled}; both targets are terminal
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        *self == PaymentStatus::Pending && next != PaymentStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Confirmed => "Confirmed",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(PaymentStatus::Pending),
            "Confirmed" => Some(PaymentStatus::Confirmed),
            "Cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment attached 1:1 to a booking. Its amount always equals the booking total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub method: String,
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn for_booking(booking: &Booking, method: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            method: method.into(),
            amount: booking.total_price,
            status: PaymentStatus::Pending,
            created_at: booking.created_at,
            updated_at: booking.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::SeatClass;

    #[test]
    fn test_payment_transitions() {
        use PaymentStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_payment_mirrors_booking_total() {
        let booking = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            SeatClass::Economy,
            2,
            Money::from_minor(200),
        );
        let payment = Payment::for_booking(&booking, "BankTransfer");

        assert_eq!(payment.booking_id, booking.id);
        assert_eq!(payment.amount, booking.total_price);
        assert_eq!(payment.status, PaymentStatus::Pending);
    }
}
