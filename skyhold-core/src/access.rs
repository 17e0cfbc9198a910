//! Capability checks for the acting identity.
//!
//! Every mutating entry point calls one of the `require_*` helpers before
//! touching state. Anything not explicitly granted is denied.

use crate::booking::Booking;
use crate::flight::Flight;
use crate::identity::{Actor, Role};
use crate::{CoreError, CoreResult};
use uuid::Uuid;

pub struct AccessScope;

impl AccessScope {
    /// Admin always; an airline only for its own flights; travelers never
    pub fn can_manage_flight(actor: &Actor, flight: &Flight) -> bool {
        Self::can_manage_airline(actor, flight.airline_id)
    }

    pub fn can_manage_airline(actor: &Actor, airline_id: Uuid) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Airline => actor.operates(airline_id),
            Role::Traveler => false,
        }
    }

    /// `flight` must be the booking's flight
    pub fn can_view_booking(actor: &Actor, booking: &Booking, flight: &Flight) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Airline => actor.operates(flight.airline_id),
            Role::Traveler => booking.traveler_id == actor.id,
        }
    }

    /// Back-office settlement of payments is restricted to admins
    pub fn can_settle_payment(actor: &Actor) -> bool {
        actor.role == Role::Admin
    }

    /// Bookings are requested by travelers for themselves
    pub fn can_book(actor: &Actor) -> bool {
        actor.role == Role::Traveler
    }

    pub fn can_cancel_booking(actor: &Actor, booking: &Booking) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Traveler => booking.traveler_id == actor.id,
            Role::Airline => false,
        }
    }

    pub fn require_manage_flight(actor: &Actor, flight: &Flight) -> CoreResult<()> {
        if Self::can_manage_flight(actor, flight) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized(format!(
                "{:?} {} cannot manage flight {}",
                actor.role, actor.id, flight.flight_number
            )))
        }
    }

    pub fn require_manage_airline(actor: &Actor, airline_id: Uuid) -> CoreResult<()> {
        if Self::can_manage_airline(actor, airline_id) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized(format!(
                "{:?} {} cannot manage airline {}",
                actor.role, actor.id, airline_id
            )))
        }
    }

    pub fn require_view_booking(actor: &Actor, booking: &Booking, flight: &Flight) -> CoreResult<()> {
        if Self::can_view_booking(actor, booking, flight) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized(format!("booking {} is not visible", booking.id)))
        }
    }

    pub fn require_settle_payment(actor: &Actor) -> CoreResult<()> {
        if Self::can_settle_payment(actor) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized("only administrators settle payments".to_string()))
        }
    }

    pub fn require_book(actor: &Actor) -> CoreResult<()> {
        if Self::can_book(actor) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized(format!("{:?} accounts cannot book seats", actor.role)))
        }
    }

    pub fn require_cancel_booking(actor: &Actor, booking: &Booking) -> CoreResult<()> {
        if Self::can_cancel_booking(actor, booking) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized(format!("booking {} cannot be cancelled by this actor", booking.id)))
        }
    }
}
