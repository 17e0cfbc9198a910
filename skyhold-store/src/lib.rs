pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod flight_repo;
pub mod memory;

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use flight_repo::PgFlightRepository;
pub use memory::{InMemoryBookingRepository, InMemoryEventLog, InMemoryFlightRepository};
