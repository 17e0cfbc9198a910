use skyhold_catalog::{CatalogRules, FlightCatalog, FlightInventory};
use skyhold_core::events::EventPublisher;
use skyhold_core::repository::{BookingRepository, FlightRepository};
use skyhold_order::{BookingLifecycle, BookingRules, PaymentLifecycle};
use skyhold_shared::Masked;
use skyhold_store::app_config::BusinessRules;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Masked<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<FlightCatalog>,
    pub inventory: Arc<FlightInventory>,
    pub bookings: Arc<BookingLifecycle>,
    pub payments: Arc<PaymentLifecycle>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wire the services over the given repositories
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        bookings: Arc<dyn BookingRepository>,
        events: Arc<dyn EventPublisher>,
        rules: &BusinessRules,
        auth: AuthConfig,
    ) -> Self {
        let inventory = Arc::new(FlightInventory::new(flights.clone()));
        let catalog = Arc::new(FlightCatalog::new(
            flights.clone(),
            CatalogRules {
                min_lead_time_hours: rules.min_lead_time_hours,
            },
        ));
        let booking_lifecycle = Arc::new(BookingLifecycle::new(
            bookings,
            flights,
            inventory.clone(),
            events.clone(),
            BookingRules {
                max_seats_per_booking: rules.max_seats_per_booking,
            },
        ));
        let payments = Arc::new(PaymentLifecycle::new(booking_lifecycle.clone(), events));

        Self {
            catalog,
            inventory,
            bookings: booking_lifecycle,
            payments,
            auth,
        }
    }
}
