use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use skyhold_core::repository::{DeleteOutcome, FlightRepository};
use skyhold_core::search::{FlightSearchQuery, PriceSort};
use skyhold_core::{AccessScope, Actor, CoreError, CoreResult, Flight, Money, Role, SeatClass, SeatClassOffer};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::pricing::PricingResolver;

// ============================================================================
// Request / Read Models
// ============================================================================

/// A new flight as submitted by an operator
#[derive(Debug, Clone, Deserialize)]
pub struct FlightDraft {
    pub flight_number: String,
    /// Required for admins; airline accounts always create for their own airline
    pub airline_id: Option<Uuid>,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub capacity: u32,
    pub offers: Vec<SeatClassOffer>,
}

/// Administrative edit. Capacity is changed through `FlightInventory::set_capacity`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightChanges {
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub offers: Option<Vec<SeatClassOffer>>,
}

/// Flight as presented to listings
#[derive(Debug, Clone, Serialize)]
pub struct FlightView {
    #[serde(flatten)]
    pub flight: Flight,
    pub lowest_price: Money,
}

impl From<Flight> for FlightView {
    fn from(flight: Flight) -> Self {
        let lowest_price = PricingResolver::lowest_price(&flight);
        Self { flight, lowest_price }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogRules {
    /// Flights are searchable only if they depart this long after the start of today
    pub min_lead_time_hours: i64,
}

impl Default for CatalogRules {
    fn default() -> Self {
        Self { min_lead_time_hours: 24 }
    }
}

// ============================================================================
// Flight Catalog
// ============================================================================

/// Flight administration and listing. Seat counters are only ever touched
/// through `FlightInventory`.
pub struct FlightCatalog {
    flights: Arc<dyn FlightRepository>,
    rules: CatalogRules,
}

impl FlightCatalog {
    pub fn new(flights: Arc<dyn FlightRepository>, rules: CatalogRules) -> Self {
        Self { flights, rules }
    }

    pub async fn create_flight(&self, actor: &Actor, draft: FlightDraft) -> CoreResult<Flight> {
        // 1. Resolve the owning airline
        let airline_id = match actor.role {
            Role::Airline => {
                let own = actor
                    .airline_id
                    .ok_or_else(|| CoreError::Unauthorized("airline account has no airline".to_string()))?;
                if draft.airline_id.is_some_and(|requested| requested != own) {
                    return Err(CoreError::Unauthorized("cannot create flights for another airline".to_string()));
                }
                own
            }
            Role::Admin => draft
                .airline_id
                .ok_or_else(|| CoreError::Validation("airline_id is required".to_string()))?,
            Role::Traveler => {
                return Err(CoreError::Unauthorized("travelers cannot create flights".to_string()));
            }
        };
        AccessScope::require_manage_airline(actor, airline_id)?;

        // 2. Validate
        if draft.capacity == 0 {
            return Err(CoreError::Validation("capacity must be at least 1".to_string()));
        }
        let now = Utc::now();
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: draft.flight_number.trim().to_string(),
            airline_id,
            origin: draft.origin.trim().to_string(),
            destination: draft.destination.trim().to_string(),
            departure_time: draft.departure_time,
            arrival_time: draft.arrival_time,
            capacity: draft.capacity,
            remaining_seats: draft.capacity,
            offers: draft.offers,
            created_at: now,
            updated_at: now,
        };
        validate_flight(&flight)?;
        self.ensure_number_free(&flight.flight_number, None).await?;

        // 3. Persist
        self.flights.insert_flight(&flight).await?;
        info!("Flight {} created by {} for airline {}", flight.flight_number, actor.id, airline_id);

        Ok(flight)
    }

    pub async fn update_flight(&self, actor: &Actor, flight_id: Uuid, changes: FlightChanges) -> CoreResult<Flight> {
        let mut flight = self.load(flight_id).await?;
        AccessScope::require_manage_flight(actor, &flight)?;

        if let Some(number) = changes.flight_number {
            flight.flight_number = number.trim().to_string();
        }
        if let Some(origin) = changes.origin {
            flight.origin = origin.trim().to_string();
        }
        if let Some(destination) = changes.destination {
            flight.destination = destination.trim().to_string();
        }
        if let Some(departure) = changes.departure_time {
            flight.departure_time = departure;
        }
        if let Some(arrival) = changes.arrival_time {
            flight.arrival_time = arrival;
        }
        if let Some(offers) = changes.offers {
            flight.offers = offers;
        }
        flight.updated_at = Utc::now();

        validate_flight(&flight)?;
        self.ensure_number_free(&flight.flight_number, Some(flight.id)).await?;

        self.persist_details(&flight).await?;
        info!("Flight {} updated by {}", flight.flight_number, actor.id);

        self.load(flight_id).await
    }

    /// Drop a seat-class offer. The last active offer cannot be removed.
    pub async fn remove_offer(&self, actor: &Actor, flight_id: Uuid, class: SeatClass) -> CoreResult<Flight> {
        let mut flight = self.load(flight_id).await?;
        AccessScope::require_manage_flight(actor, &flight)?;

        if flight.offer(class).is_none() {
            return Err(CoreError::UnknownSeatClass(class));
        }
        flight.offers.retain(|o| o.class != class);
        if !flight.has_active_offer() {
            return Err(CoreError::NoActiveSeatClass);
        }
        flight.updated_at = Utc::now();

        self.persist_details(&flight).await?;
        info!("Seat class {} removed from {} by {}", class, flight.flight_number, actor.id);

        self.load(flight_id).await
    }

    /// Delete a flight that no seat-holding booking references
    pub async fn delete_flight(&self, actor: &Actor, flight_id: Uuid) -> CoreResult<()> {
        let flight = self.load(flight_id).await?;
        AccessScope::require_manage_flight(actor, &flight)?;

        match self.flights.delete_if_unsold(flight_id).await? {
            DeleteOutcome::Deleted => {
                info!("Flight {} deleted by {}", flight.flight_number, actor.id);
                Ok(())
            }
            DeleteOutcome::HasSoldSeats => Err(CoreError::FlightHasBookings(flight_id)),
            DeleteOutcome::Missing => Err(CoreError::FlightNotFound(flight_id)),
        }
    }

    /// Airlines only see their own flights; travelers and admins see any
    pub async fn get_flight(&self, actor: &Actor, flight_id: Uuid) -> CoreResult<Flight> {
        let flight = self.load(flight_id).await?;

        if actor.role == Role::Airline && !AccessScope::can_manage_flight(actor, &flight) {
            return Err(CoreError::FlightNotFound(flight_id));
        }

        Ok(flight)
    }

    pub async fn list_flights(&self, actor: &Actor) -> CoreResult<Vec<Flight>> {
        match actor.role {
            Role::Admin => Ok(self.flights.list_flights(None).await?),
            Role::Airline => match actor.airline_id {
                Some(airline_id) => Ok(self.flights.list_flights(Some(airline_id)).await?),
                None => Ok(Vec::new()),
            },
            Role::Traveler => self.search(&FlightSearchQuery::default(), Utc::now()).await,
        }
    }

    /// Bookable flights matching `query`, as of `now`
    pub async fn search(&self, query: &FlightSearchQuery, now: DateTime<Utc>) -> CoreResult<Vec<Flight>> {
        let start_of_day = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or(now);
        let earliest = start_of_day + Duration::hours(self.rules.min_lead_time_hours);

        let origin = query.origin.as_deref().map(str::to_lowercase);
        let destination = query.destination.as_deref().map(str::to_lowercase);

        let mut flights: Vec<Flight> = self
            .flights
            .list_flights(None)
            .await?
            .into_iter()
            .filter(|f| f.remaining_seats > 0 && f.has_active_offer())
            .filter(|f| f.departure_time >= earliest)
            .filter(|f| query.date.map_or(true, |d| f.departure_time.date_naive() >= d))
            .filter(|f| origin.as_ref().map_or(true, |o| f.origin.to_lowercase().contains(o)))
            .filter(|f| destination.as_ref().map_or(true, |d| f.destination.to_lowercase().contains(d)))
            .collect();

        match query.sort {
            Some(PriceSort::Asc) => flights.sort_by_key(PricingResolver::lowest_price),
            Some(PriceSort::Desc) => {
                flights.sort_by_key(|f| std::cmp::Reverse(PricingResolver::lowest_price(f)))
            }
            None => flights.sort_by_key(|f| f.departure_time),
        }

        Ok(flights)
    }

    async fn load(&self, flight_id: Uuid) -> CoreResult<Flight> {
        self.flights
            .get_flight(flight_id)
            .await?
            .ok_or(CoreError::FlightNotFound(flight_id))
    }

    async fn persist_details(&self, flight: &Flight) -> CoreResult<()> {
        if self.flights.update_details(flight).await? {
            Ok(())
        } else {
            Err(CoreError::FlightNotFound(flight.id))
        }
    }

    async fn ensure_number_free(&self, flight_number: &str, own_id: Option<Uuid>) -> CoreResult<()> {
        match self.flights.find_by_number(flight_number).await? {
            Some(existing) if Some(existing.id) != own_id => {
                Err(CoreError::DuplicateFlightNumber(flight_number.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn validate_flight(flight: &Flight) -> CoreResult<()> {
    if flight.flight_number.is_empty() {
        return Err(CoreError::Validation("flight number is required".to_string()));
    }
    if flight.origin.is_empty() || flight.destination.is_empty() {
        return Err(CoreError::Validation("origin and destination are required".to_string()));
    }
    if flight.origin.eq_ignore_ascii_case(&flight.destination) {
        return Err(CoreError::Validation("origin and destination must differ".to_string()));
    }
    if flight.arrival_time <= flight.departure_time {
        return Err(CoreError::Validation("arrival must be after departure".to_string()));
    }

    let mut seen = HashSet::new();
    for offer in &flight.offers {
        if !seen.insert(offer.class) {
            return Err(CoreError::Validation(format!("seat class {} listed twice", offer.class)));
        }
        if offer.price.is_negative() {
            return Err(CoreError::Validation(format!("price of {} is negative", offer.class)));
        }
    }
    if !flight.has_active_offer() {
        return Err(CoreError::NoActiveSeatClass);
    }

    Ok(())
}
