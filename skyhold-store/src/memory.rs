//! In-process repositories with the same atomicity guarantees as the
//! Postgres adapters. Used by tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyhold_core::events::EventPublisher;
use skyhold_core::repository::{
    BookingQuery, BookingRepository, DeleteOutcome, FlightRepository, SeatCounts, SeatUpdate,
    StatusChange, StoreError, StoreResult, TransitionOutcome,
};
use skyhold_core::{Booking, Flight, Payment, PaymentStatus, SeatClass};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Flights keyed by id, each behind its own lock.
///
/// Seat updates hold the map's read guard while locking the flight, so they
/// serialize per flight and never race a delete (which takes the write guard).
#[derive(Default)]
pub struct InMemoryFlightRepository {
    flights: RwLock<HashMap<Uuid, Arc<Mutex<Flight>>>>,
    failing_releases: std::sync::Mutex<HashSet<Uuid>>,
}

impl InMemoryFlightRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make seat releases on `flight_id` fail with a storage error until turned off
    pub fn fail_releases(&self, flight_id: Uuid, fail: bool) {
        if let Ok(mut failing) = self.failing_releases.lock() {
            if fail {
                failing.insert(flight_id);
            } else {
                failing.remove(&flight_id);
            }
        }
    }

    fn release_fails(&self, flight_id: Uuid) -> bool {
        self.failing_releases
            .lock()
            .map(|failing| failing.contains(&flight_id))
            .unwrap_or(false)
    }

    /// Apply `update` to the flight's counters under its lock
    async fn update_counts<F>(&self, id: Uuid, update: F) -> StoreResult<SeatUpdate>
    where
        F: FnOnce(&mut Flight) -> bool + Send,
    {
        let flights = self.flights.read().await;
        let Some(entry) = flights.get(&id) else {
            return Ok(SeatUpdate::Missing);
        };

        let mut flight = entry.lock().await;
        let applied = update(&mut flight);
        let counts = SeatCounts {
            capacity: flight.capacity,
            remaining: flight.remaining_seats,
        };

        if applied {
            flight.updated_at = Utc::now();
            Ok(SeatUpdate::Applied(counts))
        } else {
            Ok(SeatUpdate::Rejected(counts))
        }
    }
}

#[async_trait]
impl FlightRepository for InMemoryFlightRepository {
    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()> {
        let mut flights = self.flights.write().await;
        for existing in flights.values() {
            if existing.lock().await.flight_number == flight.flight_number {
                return Err(format!("duplicate flight number: {}", flight.flight_number).into());
            }
        }
        flights.insert(flight.id, Arc::new(Mutex::new(flight.clone())));
        Ok(())
    }

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        let flights = self.flights.read().await;
        match flights.get(&id) {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<Flight>> {
        let flights = self.flights.read().await;
        for entry in flights.values() {
            let flight = entry.lock().await;
            if flight.flight_number == flight_number {
                return Ok(Some(flight.clone()));
            }
        }
        Ok(None)
    }

    async fn list_flights(&self, airline_id: Option<Uuid>) -> StoreResult<Vec<Flight>> {
        let flights = self.flights.read().await;
        let mut result = Vec::with_capacity(flights.len());
        for entry in flights.values() {
            let flight = entry.lock().await;
            if airline_id.map_or(true, |id| flight.airline_id == id) {
                result.push(flight.clone());
            }
        }
        result.sort_by(|a, b| {
            a.departure_time
                .cmp(&b.departure_time)
                .then_with(|| a.flight_number.cmp(&b.flight_number))
        });
        Ok(result)
    }

    async fn update_details(&self, flight: &Flight) -> StoreResult<bool> {
        let flights = self.flights.read().await;
        let Some(entry) = flights.get(&flight.id) else {
            return Ok(false);
        };

        let mut stored = entry.lock().await;
        stored.flight_number = flight.flight_number.clone();
        stored.origin = flight.origin.clone();
        stored.destination = flight.destination.clone();
        stored.departure_time = flight.departure_time;
        stored.arrival_time = flight.arrival_time;
        stored.offers = flight.offers.clone();
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn reserve_seats(&self, id: Uuid, seat_class: SeatClass, count: u32) -> StoreResult<SeatUpdate> {
        self.update_counts(id, |flight| {
            let offered = flight.offer(seat_class).is_some_and(|offer| offer.active);
            if offered && flight.remaining_seats >= count {
                flight.remaining_seats -= count;
                true
            } else {
                false
            }
        })
        .await
    }

    async fn release_seats(&self, id: Uuid, count: u32) -> StoreResult<SeatUpdate> {
        if self.release_fails(id) {
            return Err(format!("flight store unavailable: release on {}", id).into());
        }
        self.update_counts(id, |flight| match flight.remaining_seats.checked_add(count) {
            Some(next) if next <= flight.capacity => {
                flight.remaining_seats = next;
                true
            }
            _ => false,
        })
        .await
    }

    async fn resize_capacity(&self, id: Uuid, new_capacity: u32) -> StoreResult<SeatUpdate> {
        self.update_counts(id, |flight| {
            let sold = flight.sold_seats();
            if new_capacity < sold {
                return false;
            }
            flight.capacity = new_capacity;
            flight.remaining_seats = new_capacity - sold;
            true
        })
        .await
    }

    async fn delete_if_unsold(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        let mut flights = self.flights.write().await;
        let Some(entry) = flights.get(&id) else {
            return Ok(DeleteOutcome::Missing);
        };

        let unsold = {
            let flight = entry.lock().await;
            flight.remaining_seats == flight.capacity
        };
        if !unsold {
            return Ok(DeleteOutcome::HasSoldSeats);
        }

        flights.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }
}

#[derive(Default)]
struct BookingTables {
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
    payment_by_booking: HashMap<Uuid, Uuid>,
}

/// Bookings and payments behind a single lock, so every transition sees
/// both rows in one consistent state.
///
/// Transitions that release seats do so through `flights` while still
/// holding the table lock, and only write the new statuses once the flight
/// took the seats back. Lock order is always tables, then flight.
pub struct InMemoryBookingRepository {
    tables: Mutex<BookingTables>,
    flights: Arc<InMemoryFlightRepository>,
    fail_inserts: AtomicBool,
}

impl InMemoryBookingRepository {
    pub fn new(flights: Arc<InMemoryFlightRepository>) -> Self {
        Self {
            tables: Mutex::default(),
            flights,
            fail_inserts: AtomicBool::new(false),
        }
    }

    /// Make subsequent inserts fail, simulating a storage outage
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

fn newest_first<T, F>(items: &mut [T], created_at: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert_booking(&self, booking: &Booking, payment: &Payment) -> StoreResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err("booking store unavailable".into());
        }

        let mut tables = self.tables.lock().await;
        if tables.bookings.contains_key(&booking.id) || tables.payments.contains_key(&payment.id) {
            return Err(format!("duplicate booking: {}", booking.id).into());
        }
        tables.payment_by_booking.insert(booking.id, payment.id);
        tables.bookings.insert(booking.id, booking.clone());
        tables.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.tables.lock().await.bookings.get(&id).cloned())
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.tables.lock().await.payments.get(&id).cloned())
    }

    async fn payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payment_by_booking
            .get(&booking_id)
            .and_then(|id| tables.payments.get(id))
            .cloned())
    }

    async fn list_bookings(&self, query: &BookingQuery) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.lock().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        newest_first(&mut bookings, |b| b.created_at);
        Ok(bookings)
    }

    async fn list_payments(&self, query: &BookingQuery) -> StoreResult<Vec<Payment>> {
        let tables = self.tables.lock().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .values()
            .filter(|p| query.payment_status.map_or(true, |s| p.status == s))
            .filter(|p| tables.bookings.get(&p.booking_id).is_some_and(|b| query.matches(b)))
            .cloned()
            .collect();
        newest_first(&mut payments, |p| p.created_at);
        Ok(payments)
    }

    async fn transition(&self, booking_id: Uuid, change: &StatusChange) -> StoreResult<TransitionOutcome> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let Some(payment_id) = tables.payment_by_booking.get(&booking_id).copied() else {
            return Ok(TransitionOutcome::Missing);
        };
        let (Some(booking), Some(payment)) = (
            tables.bookings.get_mut(&booking_id),
            tables.payments.get_mut(&payment_id),
        ) else {
            return Ok(TransitionOutcome::Missing);
        };

        if !change.permits(booking.status, payment.status) {
            return Ok(TransitionOutcome::Rejected {
                booking: booking.status,
                payment: payment.status,
            });
        }

        if change.releases_seats {
            match self.flights.release_seats(booking.flight_id, booking.seat_count).await? {
                SeatUpdate::Applied(_) => {}
                SeatUpdate::Rejected(counts) => {
                    return Ok(TransitionOutcome::ReleaseRefused {
                        booking: booking.clone(),
                        seats: Some(counts),
                    })
                }
                SeatUpdate::Missing => {
                    return Ok(TransitionOutcome::ReleaseRefused {
                        booking: booking.clone(),
                        seats: None,
                    })
                }
            }
        }

        let now = Utc::now();
        booking.status = change.booking_to;
        booking.updated_at = now;
        if payment.status == PaymentStatus::Pending {
            payment.status = change.payment_to;
            payment.updated_at = now;
        }

        Ok(TransitionOutcome::Applied {
            booking: booking.clone(),
            payment: payment.clone(),
        })
    }

    async fn pending_created_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.lock().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.status == skyhold_core::BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }
}

/// A published event as recorded by [`InMemoryEventLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub topic: String,
    pub key: String,
    pub payload: String,
}

/// Publisher that keeps every event in memory for inspection
#[derive(Default)]
pub struct InMemoryEventLog {
    events: std::sync::Mutex<Vec<RecordedEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn topics(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.topic).collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventLog {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), StoreError> {
        let mut events = self.events.lock().map_err(|e| e.to_string())?;
        events.push(RecordedEvent {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}
