use chrono::Utc;
use serde::Deserialize;
use skyhold_catalog::{FlightInventory, PricingResolver};
use skyhold_core::events::{publish_json, EventPublisher};
use skyhold_core::repository::{
    BookingQuery, BookingRepository, FlightRepository, SeatCounts, StatusChange, TransitionOutcome,
};
use skyhold_core::{
    AccessScope, Actor, Booking, BookingStatus, CoreError, CoreResult, Flight, Payment, Role, SeatClass,
};
use skyhold_shared::models::events::{topics, BookingCreatedEvent, BookingStatusChangedEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::views::BookingView;

/// Limits applied to every booking request
#[derive(Debug, Clone, Copy)]
pub struct BookingRules {
    pub max_seats_per_booking: u32,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self { max_seats_per_booking: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub flight_id: Uuid,
    pub seat_class: SeatClass,
    pub seat_count: u32,
    pub payment_method: String,
}

/// Optional narrowing of a booking listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub flight_number: Option<String>,
    pub booking_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

/// Drives a booking from request to a terminal status.
///
/// Every status change goes through the repository's `transition`, which
/// checks and sets booking and payment status in one step and, for
/// cancellations, returns the seats to the flight in that same step. A
/// cancellation that fails leaves the booking holding its seats, so retrying
/// it is safe, and each booking's seats are released at most once.
pub struct BookingLifecycle {
    bookings: Arc<dyn BookingRepository>,
    flights: Arc<dyn FlightRepository>,
    inventory: Arc<FlightInventory>,
    events: Arc<dyn EventPublisher>,
    rules: BookingRules,
}

impl BookingLifecycle {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        flights: Arc<dyn FlightRepository>,
        inventory: Arc<FlightInventory>,
        events: Arc<dyn EventPublisher>,
        rules: BookingRules,
    ) -> Self {
        Self {
            bookings,
            flights,
            inventory,
            events,
            rules,
        }
    }

    /// Price, reserve and persist a new Pending booking with its Pending payment
    pub async fn create(&self, actor: &Actor, request: BookingRequest) -> CoreResult<BookingView> {
        AccessScope::require_book(actor)?;

        let count = request.seat_count;
        if count == 0 || count > self.rules.max_seats_per_booking {
            return Err(CoreError::InvalidCount {
                requested: count,
                max: self.rules.max_seats_per_booking,
            });
        }
        if request.payment_method.trim().is_empty() {
            return Err(CoreError::Validation("payment method is required".to_string()));
        }

        let flight = self.load_flight(request.flight_id).await?;
        let total = PricingResolver::total(&flight, request.seat_class, count)?;

        let reservation = self.inventory.reserve(flight.id, request.seat_class, count).await?;

        let booking = Booking::new(flight.id, actor.id, request.seat_class, count, total);
        let payment = Payment::for_booking(&booking, request.payment_method.trim());

        if let Err(e) = self.bookings.insert_booking(&booking, &payment).await {
            error!("Failed to persist booking {} on {}: {}", booking.id, flight.flight_number, e);
            // Hand the seats back before surfacing the failure
            if let Err(release_err) = self.inventory.release(flight.id, count).await {
                error!(
                    "Compensating release of {} seats on {} failed: {}",
                    count, flight.flight_number, release_err
                );
            }
            return Err(CoreError::Storage(e));
        }

        info!(
            "Booking {} created: {} x {} on {} ({} seats left)",
            booking.id, count, request.seat_class, flight.flight_number, reservation.remaining_after
        );

        let event = BookingCreatedEvent {
            booking_id: booking.id,
            payment_id: payment.id,
            flight_id: flight.id,
            traveler_id: booking.traveler_id,
            seat_class: booking.seat_class.to_string(),
            seat_count: booking.seat_count,
            total_price: booking.total_price,
            timestamp: Utc::now().timestamp(),
        };
        publish_json(self.events.as_ref(), topics::BOOKING_CREATED, &booking.id.to_string(), &event).await;

        Ok(BookingView {
            booking,
            flight_number: flight.flight_number,
            payment: Some(payment),
        })
    }

    /// Cancel a Pending or Confirmed booking and return its seats
    pub async fn cancel(&self, actor: &Actor, booking_id: Uuid) -> CoreResult<BookingView> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(booking_id))?;
        AccessScope::require_cancel_booking(actor, &booking)?;

        let (booking, payment) = match self.bookings.transition(booking_id, &StatusChange::CANCEL_BOOKING).await? {
            TransitionOutcome::Applied { booking, payment } => (booking, payment),
            TransitionOutcome::Rejected { .. } => return Err(CoreError::AlreadyCancelled(booking_id)),
            TransitionOutcome::ReleaseRefused { booking, seats } => return Err(release_refused(&booking, seats)),
            TransitionOutcome::Missing => return Err(CoreError::BookingNotFound(booking_id)),
        };

        info!(
            "Booking {} cancelled by {:?} {}, {} seats released",
            booking.id, actor.role, actor.id, booking.seat_count
        );
        self.publish_status(topics::BOOKING_CANCELLED, &booking, booking.seat_count).await;

        let flight_number = self.flight_number(booking.flight_id).await?;
        Ok(BookingView {
            booking,
            flight_number,
            payment: Some(payment),
        })
    }

    /// Payment settled: the Pending booking becomes Confirmed. Seats stay held.
    pub(crate) async fn on_payment_confirmed(&self, booking_id: Uuid) -> CoreResult<(Booking, Payment)> {
        let (booking, payment) = self.settle(booking_id, &StatusChange::CONFIRM_PAYMENT).await?;

        info!("Booking {} confirmed", booking.id);
        self.publish_status(topics::BOOKING_CONFIRMED, &booking, 0).await;
        Ok((booking, payment))
    }

    /// Payment cancelled: the Pending booking is cancelled and its seats released
    pub(crate) async fn on_payment_cancelled(&self, booking_id: Uuid) -> CoreResult<(Booking, Payment)> {
        let (booking, payment) = self.settle(booking_id, &StatusChange::CANCEL_PAYMENT).await?;

        info!(
            "Booking {} cancelled after payment cancellation, {} seats released",
            booking.id, booking.seat_count
        );
        self.publish_status(topics::BOOKING_CANCELLED, &booking, booking.seat_count).await;
        Ok((booking, payment))
    }

    /// Cancel a stale Pending booking. Returns false if another transition got there first.
    pub(crate) async fn expire(&self, booking_id: Uuid) -> CoreResult<bool> {
        let booking = match self.bookings.transition(booking_id, &StatusChange::CANCEL_PAYMENT).await? {
            TransitionOutcome::Applied { booking, .. } => booking,
            TransitionOutcome::ReleaseRefused { booking, seats } => return Err(release_refused(&booking, seats)),
            TransitionOutcome::Rejected { .. } | TransitionOutcome::Missing => return Ok(false),
        };

        info!("Booking {} expired, {} seats released", booking.id, booking.seat_count);
        self.publish_status(topics::BOOKING_EXPIRED, &booking, booking.seat_count).await;
        Ok(true)
    }

    pub async fn get(&self, actor: &Actor, booking_id: Uuid) -> CoreResult<BookingView> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(booking_id))?;
        let flight = self.load_flight(booking.flight_id).await?;
        AccessScope::require_view_booking(actor, &booking, &flight)?;

        let payment = self.bookings.payment_for_booking(booking_id).await?;
        Ok(BookingView {
            booking,
            flight_number: flight.flight_number,
            payment,
        })
    }

    /// Bookings visible to `actor`, newest first
    pub async fn list(&self, actor: &Actor, filter: &BookingFilter) -> CoreResult<Vec<BookingView>> {
        let Some(mut query) = self.scoped_query(actor, filter.flight_number.as_deref()).await? else {
            return Ok(Vec::new());
        };
        query.booking_id = filter.booking_id;
        query.status = filter.status;

        let bookings = self.bookings.list_bookings(&query).await?;
        let mut payments: HashMap<Uuid, Payment> = self
            .bookings
            .list_payments(&query)
            .await?
            .into_iter()
            .map(|p| (p.booking_id, p))
            .collect();
        let numbers = self.flight_numbers(bookings.iter().map(|b| b.flight_id)).await?;

        Ok(bookings
            .into_iter()
            .map(|booking| BookingView {
                flight_number: numbers.get(&booking.flight_id).cloned().unwrap_or_default(),
                payment: payments.remove(&booking.id),
                booking,
            })
            .collect())
    }

    pub(crate) fn repository(&self) -> &Arc<dyn BookingRepository> {
        &self.bookings
    }

    pub(crate) async fn load_flight(&self, flight_id: Uuid) -> CoreResult<Flight> {
        self.flights
            .get_flight(flight_id)
            .await?
            .ok_or(CoreError::FlightNotFound(flight_id))
    }

    /// Base query restricted to what `actor` may see, or None if the scope
    /// (after the optional flight-number filter) matches nothing
    pub(crate) async fn scoped_query(&self, actor: &Actor, flight_number: Option<&str>) -> CoreResult<Option<BookingQuery>> {
        let mut query = BookingQuery::default();

        match actor.role {
            Role::Admin => {}
            Role::Airline => {
                let airline_id = actor
                    .airline_id
                    .ok_or_else(|| CoreError::Unauthorized(format!("airline account {} has no airline", actor.id)))?;
                let ids = self
                    .flights
                    .list_flights(Some(airline_id))
                    .await?
                    .into_iter()
                    .map(|f| f.id)
                    .collect();
                query.flight_ids = Some(ids);
            }
            Role::Traveler => query.traveler_id = Some(actor.id),
        }

        if let Some(number) = flight_number.map(str::trim).filter(|n| !n.is_empty()) {
            let Some(flight) = self.flights.find_by_number(number).await? else {
                return Ok(None);
            };
            match query.flight_ids.as_mut() {
                Some(ids) => ids.retain(|id| *id == flight.id),
                None => query.flight_ids = Some(vec![flight.id]),
            }
        }

        if query.flight_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(None);
        }
        Ok(Some(query))
    }

    pub(crate) async fn flight_numbers(&self, ids: impl Iterator<Item = Uuid>) -> CoreResult<HashMap<Uuid, String>> {
        let mut numbers = HashMap::new();
        for id in ids {
            if numbers.contains_key(&id) {
                continue;
            }
            if let Some(flight) = self.flights.get_flight(id).await? {
                numbers.insert(id, flight.flight_number);
            }
        }
        Ok(numbers)
    }

    async fn flight_number(&self, flight_id: Uuid) -> CoreResult<String> {
        Ok(self
            .flights
            .get_flight(flight_id)
            .await?
            .map(|f| f.flight_number)
            .unwrap_or_default())
    }

    /// Apply a payment-driven change; the loser of a race sees the payment's status
    async fn settle(&self, booking_id: Uuid, change: &StatusChange) -> CoreResult<(Booking, Payment)> {
        match self.bookings.transition(booking_id, change).await? {
            TransitionOutcome::Applied { booking, payment } => Ok((booking, payment)),
            TransitionOutcome::Rejected { payment: status, .. } => {
                let payment_id = self
                    .bookings
                    .payment_for_booking(booking_id)
                    .await?
                    .map(|p| p.id)
                    .unwrap_or(booking_id);
                Err(CoreError::NotPending { payment_id, status })
            }
            TransitionOutcome::ReleaseRefused { booking, seats } => Err(release_refused(&booking, seats)),
            TransitionOutcome::Missing => Err(CoreError::BookingNotFound(booking_id)),
        }
    }

    async fn publish_status(&self, topic: &str, booking: &Booking, seats_released: u32) {
        let event = BookingStatusChangedEvent {
            booking_id: booking.id,
            flight_id: booking.flight_id,
            status: booking.status.to_string(),
            seats_released,
            timestamp: Utc::now().timestamp(),
        };
        publish_json(self.events.as_ref(), topic, &booking.id.to_string(), &event).await;
    }
}

/// The flight would not take the booking's seats back; the booking was left as it was
fn release_refused(booking: &Booking, seats: Option<SeatCounts>) -> CoreError {
    error!("Booking {} kept {} seats: release refused", booking.id, booking.seat_count);
    FlightInventory::release_refused(booking.flight_id, booking.seat_count, seats)
}
