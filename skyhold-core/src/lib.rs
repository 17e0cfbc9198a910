pub mod access;
pub mod booking;
pub mod events;
pub mod flight;
pub mod identity;
pub mod payment;
pub mod repository;
pub mod search;

pub use access::AccessScope;
pub use booking::{Booking, BookingStatus};
pub use flight::{Flight, SeatClass, SeatClassOffer};
pub use identity::{Actor, Role};
pub use payment::{Payment, PaymentStatus};
pub use skyhold_shared::Money;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("Insufficient seats: requested {requested}, available {available}")]
    InsufficientSeats { requested: u32, available: u32 },

    #[error("Invalid seat count {requested}: must be between 1 and {max}")]
    InvalidCount { requested: u32, max: u32 },

    #[error("Seat class {0} is not offered on this flight")]
    UnknownSeatClass(SeatClass),

    #[error("Seat class {0} is not currently sold on this flight")]
    InactiveSeatClass(SeatClass),

    #[error("Booking already cancelled: {0}")]
    AlreadyCancelled(Uuid),

    #[error("Payment {payment_id} is not pending (status {status})")]
    NotPending { payment_id: Uuid, status: PaymentStatus },

    #[error("Capacity {requested} is below the {sold} seats already sold")]
    CapacityBelowSold { requested: u32, sold: u32 },

    #[error("Flight number already in use: {0}")]
    DuplicateFlightNumber(String),

    #[error("A flight must keep at least one active seat class")]
    NoActiveSeatClass,

    #[error("Flight {0} still has seat-holding bookings")]
    FlightHasBookings(Uuid),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Storage error: {0}")]
    Storage(#[source] repository::StoreError),
}

impl CoreError {
    /// Fatal errors indicate a broken invariant or an unavailable datastore.
    /// They must never be rendered as an ordinary validation message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::ConsistencyViolation(_) | CoreError::Storage(_))
    }
}

impl From<repository::StoreError> for CoreError {
    fn from(err: repository::StoreError) -> Self {
        CoreError::Storage(err)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
