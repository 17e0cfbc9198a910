use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::flight::{Flight, SeatClass};
use crate::payment::{Payment, PaymentStatus};

/// Errors crossing the storage-adapter boundary
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Seat counters of a flight as observed by an atomic update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatCounts {
    pub capacity: u32,
    pub remaining: u32,
}

impl SeatCounts {
    pub fn sold(&self) -> u32 {
        self.capacity.saturating_sub(self.remaining)
    }
}

/// Result of a single conditional update on a flight's seat counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatUpdate {
    /// The guard held and the counters now read as given
    Applied(SeatCounts),
    /// The guard failed; counters are untouched and read as given
    Rejected(SeatCounts),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Seats are still committed to bookings
    HasSoldSeats,
    Missing,
}

/// Repository for flights.
///
/// The seat primitives must each be a single linearizable step per flight:
/// either a conditional `UPDATE ... WHERE` or a check-and-write under the
/// flight's lock. No caller ever reads `remaining_seats` and writes it back.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()>;

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>>;

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<Flight>>;

    /// All flights, or only those of `airline_id`
    async fn list_flights(&self, airline_id: Option<Uuid>) -> StoreResult<Vec<Flight>>;

    /// Persist schedule, route, number and offers. Seat counters are left alone.
    /// Returns false if the flight does not exist.
    async fn update_details(&self, flight: &Flight) -> StoreResult<bool>;

    /// Decrement `remaining_seats` by `count` iff `remaining_seats >= count`
    /// and `seat_class` is still offered and active on the flight
    async fn reserve_seats(&self, id: Uuid, seat_class: SeatClass, count: u32) -> StoreResult<SeatUpdate>;

    /// Increment `remaining_seats` by `count` iff the result stays `<= capacity`
    async fn release_seats(&self, id: Uuid, count: u32) -> StoreResult<SeatUpdate>;

    /// Set capacity iff it is not below the seats already sold; remaining seats
    /// shift by the same delta
    async fn resize_capacity(&self, id: Uuid, new_capacity: u32) -> StoreResult<SeatUpdate>;

    /// Delete iff no seats are sold (`remaining_seats == capacity`)
    async fn delete_if_unsold(&self, id: Uuid) -> StoreResult<DeleteOutcome>;
}

/// Filters for booking and payment listings
#[derive(Debug, Clone, Default)]
pub struct BookingQuery {
    pub booking_id: Option<Uuid>,
    pub traveler_id: Option<Uuid>,
    /// Restrict to these flights; an empty list matches nothing
    pub flight_ids: Option<Vec<Uuid>>,
    pub status: Option<BookingStatus>,
    /// Only used by payment listings
    pub payment_status: Option<PaymentStatus>,
}

impl BookingQuery {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.booking_id.map_or(true, |id| booking.id == id)
            && self.traveler_id.map_or(true, |id| booking.traveler_id == id)
            && self
                .flight_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&booking.flight_id))
            && self.status.map_or(true, |s| booking.status == s)
    }
}

/// A combined booking/payment status change applied as one check-and-set.
///
/// The change applies only if the booking is in one of `booking_from` and,
/// when `require_pending_payment` is set, the payment is still Pending.
/// The payment moves to `payment_to` only if it is Pending at that moment.
/// With `releases_seats` the booking's seats go back to its flight in the
/// same atomic unit; if the flight refuses them nothing is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub booking_from: &'static [BookingStatus],
    pub booking_to: BookingStatus,
    pub require_pending_payment: bool,
    pub payment_to: PaymentStatus,
    pub releases_seats: bool,
}

impl StatusChange {
    /// Traveler or admin cancels; a still-pending payment is cancelled with it
    pub const CANCEL_BOOKING: StatusChange = StatusChange {
        booking_from: &[BookingStatus::Pending, BookingStatus::Confirmed],
        booking_to: BookingStatus::Cancelled,
        require_pending_payment: false,
        payment_to: PaymentStatus::Cancelled,
        releases_seats: true,
    };

    pub const CONFIRM_PAYMENT: StatusChange = StatusChange {
        booking_from: &[BookingStatus::Pending],
        booking_to: BookingStatus::Confirmed,
        require_pending_payment: true,
        payment_to: PaymentStatus::Confirmed,
        releases_seats: false,
    };

    /// Payment cancellation and pending-booking expiry share this change
    pub const CANCEL_PAYMENT: StatusChange = StatusChange {
        booking_from: &[BookingStatus::Pending],
        booking_to: BookingStatus::Cancelled,
        require_pending_payment: true,
        payment_to: PaymentStatus::Cancelled,
        releases_seats: true,
    };

    pub fn permits(&self, booking: BookingStatus, payment: PaymentStatus) -> bool {
        self.booking_from.contains(&booking)
            && (!self.require_pending_payment || payment == PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied { booking: Booking, payment: Payment },
    /// Guard failed; statuses as observed under the lock
    Rejected { booking: BookingStatus, payment: PaymentStatus },
    /// The flight refused the seat release (over capacity, or `None` if the
    /// flight is gone). Nothing was committed; `booking` is unchanged.
    ReleaseRefused { booking: Booking, seats: Option<SeatCounts> },
    Missing,
}

/// Repository for bookings and their 1:1 payments
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a new booking together with its payment
    async fn insert_booking(&self, booking: &Booking, payment: &Payment) -> StoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>>;

    async fn payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>>;

    async fn list_bookings(&self, query: &BookingQuery) -> StoreResult<Vec<Booking>>;

    async fn list_payments(&self, query: &BookingQuery) -> StoreResult<Vec<Payment>>;

    /// Atomically apply `change` to the booking, its payment and, when the
    /// change releases seats, its flight's counters. A storage error leaves
    /// all three untouched.
    async fn transition(&self, booking_id: Uuid, change: &StatusChange) -> StoreResult<TransitionOutcome>;

    /// Pending bookings created before `cutoff`
    async fn pending_created_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Booking>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_change_guards() {
        use BookingStatus as B;
        use PaymentStatus as P;

        assert!(StatusChange::CANCEL_BOOKING.permits(B::Pending, P::Pending));
        assert!(StatusChange::CANCEL_BOOKING.permits(B::Confirmed, P::Confirmed));
        assert!(!StatusChange::CANCEL_BOOKING.permits(B::Cancelled, P::Cancelled));

        assert!(StatusChange::CONFIRM_PAYMENT.permits(B::Pending, P::Pending));
        assert!(!StatusChange::CONFIRM_PAYMENT.permits(B::Confirmed, P::Confirmed));
        assert!(!StatusChange::CONFIRM_PAYMENT.permits(B::Cancelled, P::Pending));

        assert!(!StatusChange::CANCEL_PAYMENT.permits(B::Confirmed, P::Confirmed));

        assert!(StatusChange::CANCEL_BOOKING.releases_seats);
        assert!(StatusChange::CANCEL_PAYMENT.releases_seats);
        assert!(!StatusChange::CONFIRM_PAYMENT.releases_seats);
    }

    #[test]
    fn test_status_changes_follow_state_machines() {
        for change in [
            StatusChange::CANCEL_BOOKING,
            StatusChange::CONFIRM_PAYMENT,
            StatusChange::CANCEL_PAYMENT,
        ] {
            for from in change.booking_from {
                assert!(from.can_transition_to(change.booking_to));
            }
            assert!(PaymentStatus::Pending.can_transition_to(change.payment_to));
        }
    }

    #[test]
    fn test_query_matching() {
        let flight = Uuid::new_v4();
        let booking = Booking::new(
            flight,
            Uuid::new_v4(),
            crate::flight::SeatClass::Economy,
            1,
            skyhold_shared::Money::from_minor(10),
        );

        assert!(BookingQuery::default().matches(&booking));
        assert!(BookingQuery { flight_ids: Some(vec![flight]), ..Default::default() }.matches(&booking));
        assert!(!BookingQuery { flight_ids: Some(vec![]), ..Default::default() }.matches(&booking));
        assert!(!BookingQuery { status: Some(BookingStatus::Confirmed), ..Default::default() }.matches(&booking));
    }
}
