use skyhold_core::{CoreError, CoreResult, Flight, Money, SeatClass};
use tracing::warn;

/// Resolves fares from a flight's seat-class offers
pub struct PricingResolver;

impl PricingResolver {
    /// Unit price of `class` on `flight`
    pub fn price_for(flight: &Flight, class: SeatClass) -> CoreResult<Money> {
        let offer = flight.offer(class).ok_or(CoreError::UnknownSeatClass(class))?;

        if !offer.active {
            return Err(CoreError::InactiveSeatClass(class));
        }

        Ok(offer.price)
    }

    /// Cheapest active offer, used for listings and sorting.
    ///
    /// Returns zero when no offer is active; that state is a data-integrity
    /// problem and is logged.
    pub fn lowest_price(flight: &Flight) -> Money {
        match flight.active_offers().map(|o| o.price).min() {
            Some(price) => price,
            None => {
                warn!("Flight {} has no active seat class", flight.flight_number);
                Money::ZERO
            }
        }
    }

    /// `price_for(flight, class) * count` in integer minor units
    pub fn total(flight: &Flight, class: SeatClass, count: u32) -> CoreResult<Money> {
        let unit = Self::price_for(flight, class)?;

        unit.checked_mul(count).ok_or_else(|| {
            CoreError::Validation(format!("total for {} x {} overflows", count, unit))
        })
    }
}
