use skyhold_core::repository::{FlightRepository, SeatCounts, SeatUpdate};
use skyhold_core::{AccessScope, Actor, CoreError, CoreResult, Flight, SeatClass};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Seats taken off a flight on behalf of one booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub flight_id: Uuid,
    pub seat_class: SeatClass,
    pub count: u32,
    pub remaining_after: u32,
}

/// Owner of every flight's seat counters.
///
/// All reserve/release/capacity changes go through the repository's
/// conditional updates, so concurrent calls on one flight behave as some
/// serial order and `0 <= remaining_seats <= capacity` always holds.
pub struct FlightInventory {
    flights: Arc<dyn FlightRepository>,
}

impl FlightInventory {
    pub fn new(flights: Arc<dyn FlightRepository>) -> Self {
        Self { flights }
    }

    /// Take `count` seats of `seat_class`. Never waits for seats to free up.
    ///
    /// The class is checked up front for a clear error and again inside the
    /// conditional update, so a class deactivated meanwhile sells nothing.
    pub async fn reserve(&self, flight_id: Uuid, seat_class: SeatClass, count: u32) -> CoreResult<Reservation> {
        let flight = self.load(flight_id).await?;
        check_offer(&flight, seat_class)?;
        if count == 0 {
            return Err(CoreError::InvalidCount { requested: 0, max: flight.capacity });
        }

        match self.flights.reserve_seats(flight_id, seat_class, count).await? {
            SeatUpdate::Applied(counts) => {
                info!(
                    "Reserved {} {} seats on {}: {} remaining",
                    count, seat_class, flight.flight_number, counts.remaining
                );
                Ok(Reservation {
                    flight_id,
                    seat_class,
                    count,
                    remaining_after: counts.remaining,
                })
            }
            SeatUpdate::Rejected(counts) if counts.remaining >= count => {
                // Enough seats, so the class guard failed
                let current = self.load(flight_id).await?;
                check_offer(&current, seat_class)?;
                Err(CoreError::InactiveSeatClass(seat_class))
            }
            SeatUpdate::Rejected(counts) => Err(CoreError::InsufficientSeats {
                requested: count,
                available: counts.remaining,
            }),
            SeatUpdate::Missing => Err(CoreError::FlightNotFound(flight_id)),
        }
    }

    /// Return `count` seats to the flight.
    ///
    /// A release that would push `remaining_seats` above capacity is not
    /// applied and surfaces as `ConsistencyViolation`.
    pub async fn release(&self, flight_id: Uuid, count: u32) -> CoreResult<SeatCounts> {
        match self.flights.release_seats(flight_id, count).await? {
            SeatUpdate::Applied(counts) => {
                info!("Released {} seats on flight {}: {} remaining", count, flight_id, counts.remaining);
                Ok(counts)
            }
            SeatUpdate::Rejected(counts) => Err(Self::release_refused(flight_id, count, Some(counts))),
            SeatUpdate::Missing => Err(Self::release_refused(flight_id, count, None)),
        }
    }

    /// The error for a release the flight would not take back: over capacity
    /// when `counts` is given, otherwise the flight is gone
    pub fn release_refused(flight_id: Uuid, count: u32, counts: Option<SeatCounts>) -> CoreError {
        match counts {
            Some(counts) => {
                error!(
                    "Release of {} seats on flight {} would exceed capacity {} (remaining {})",
                    count, flight_id, counts.capacity, counts.remaining
                );
                CoreError::ConsistencyViolation(format!(
                    "release of {} seats on flight {} exceeds capacity {}",
                    count, flight_id, counts.capacity
                ))
            }
            None => {
                error!("Release of {} seats on missing flight {}", count, flight_id);
                CoreError::ConsistencyViolation(format!("seats released on missing flight {}", flight_id))
            }
        }
    }

    /// Administrative capacity change; never below the seats already sold
    pub async fn set_capacity(&self, actor: &Actor, flight_id: Uuid, new_capacity: u32) -> CoreResult<Flight> {
        let flight = self.load(flight_id).await?;
        AccessScope::require_manage_flight(actor, &flight)?;

        if new_capacity == 0 {
            return Err(CoreError::Validation("capacity must be at least 1".to_string()));
        }

        match self.flights.resize_capacity(flight_id, new_capacity).await? {
            SeatUpdate::Applied(counts) => {
                info!(
                    "Capacity of {} set to {} by {}: {} remaining",
                    flight.flight_number, counts.capacity, actor.id, counts.remaining
                );
                self.load(flight_id).await
            }
            SeatUpdate::Rejected(counts) => Err(CoreError::CapacityBelowSold {
                requested: new_capacity,
                sold: counts.sold(),
            }),
            SeatUpdate::Missing => Err(CoreError::FlightNotFound(flight_id)),
        }
    }

    async fn load(&self, flight_id: Uuid) -> CoreResult<Flight> {
        self.flights
            .get_flight(flight_id)
            .await?
            .ok_or(CoreError::FlightNotFound(flight_id))
    }
}

fn check_offer(flight: &Flight, seat_class: SeatClass) -> CoreResult<()> {
    let offer = flight.offer(seat_class).ok_or(CoreError::UnknownSeatClass(seat_class))?;
    if !offer.active {
        return Err(CoreError::InactiveSeatClass(seat_class));
    }
    Ok(())
}
