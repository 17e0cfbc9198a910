pub mod flights;
pub mod inventory;
pub mod pricing;

pub use flights::{CatalogRules, FlightCatalog, FlightChanges, FlightDraft, FlightView};
pub use inventory::{FlightInventory, Reservation};
pub use pricing::PricingResolver;
