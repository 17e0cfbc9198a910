pub mod booking;
pub mod expiry;
pub mod payment;
pub mod views;

pub use booking::{BookingFilter, BookingLifecycle, BookingRequest, BookingRules};
pub use expiry::ExpirySweeper;
pub use payment::{PaymentFilter, PaymentLifecycle};
pub use views::{BookingView, PaymentView};

#[cfg(test)]
mod tests;
