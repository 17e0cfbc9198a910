use chrono::Utc;
use serde::Deserialize;
use skyhold_core::events::{publish_json, EventPublisher};
use skyhold_core::{AccessScope, Actor, Booking, CoreError, CoreResult, Payment, PaymentStatus};
use skyhold_shared::models::events::{topics, PaymentSettledEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::booking::BookingLifecycle;
use crate::views::PaymentView;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    pub flight_number: Option<String>,
    pub booking_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

/// Back-office settlement of the payment attached to each booking.
///
/// Both settlements are one-way out of Pending and drive the linked booking.
pub struct PaymentLifecycle {
    bookings: Arc<BookingLifecycle>,
    events: Arc<dyn EventPublisher>,
}

impl PaymentLifecycle {
    pub fn new(bookings: Arc<BookingLifecycle>, events: Arc<dyn EventPublisher>) -> Self {
        Self { bookings, events }
    }

    pub async fn confirm(&self, actor: &Actor, payment_id: Uuid) -> CoreResult<PaymentView> {
        let payment = self.load_pending(actor, payment_id).await?;

        let (booking, payment) = self.bookings.on_payment_confirmed(payment.booking_id).await?;
        info!("Payment {} confirmed by {}", payment.id, actor.id);
        self.publish(topics::PAYMENT_CONFIRMED, &payment, actor).await;

        self.view(payment, &booking).await
    }

    /// Cancel a Pending payment, which cancels its booking and releases the seats.
    /// Confirmed payments are final.
    pub async fn cancel(&self, actor: &Actor, payment_id: Uuid) -> CoreResult<PaymentView> {
        let payment = self.load_pending(actor, payment_id).await?;

        let (booking, payment) = self.bookings.on_payment_cancelled(payment.booking_id).await?;
        info!("Payment {} cancelled by {}", payment.id, actor.id);
        self.publish(topics::PAYMENT_CANCELLED, &payment, actor).await;

        self.view(payment, &booking).await
    }

    pub async fn get(&self, actor: &Actor, payment_id: Uuid) -> CoreResult<PaymentView> {
        let payment = self.load(payment_id).await?;
        let booking = self.booking_of(&payment).await?;
        let flight = self.bookings.load_flight(booking.flight_id).await?;
        AccessScope::require_view_booking(actor, &booking, &flight)?;

        Ok(PaymentView::new(payment, &booking, flight.flight_number))
    }

    /// Payments visible to `actor`, newest first
    pub async fn list(&self, actor: &Actor, filter: &PaymentFilter) -> CoreResult<Vec<PaymentView>> {
        let Some(mut query) = self.bookings.scoped_query(actor, filter.flight_number.as_deref()).await? else {
            return Ok(Vec::new());
        };
        query.booking_id = filter.booking_id;
        query.payment_status = filter.status;

        let repo = self.bookings.repository();
        let payments = repo.list_payments(&query).await?;
        query.payment_status = None;
        let bookings: HashMap<Uuid, Booking> = repo
            .list_bookings(&query)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();
        let numbers = self
            .bookings
            .flight_numbers(bookings.values().map(|b| b.flight_id))
            .await?;

        Ok(payments
            .into_iter()
            .filter_map(|payment| {
                let booking = bookings.get(&payment.booking_id)?;
                let number = numbers.get(&booking.flight_id).cloned().unwrap_or_default();
                Some(PaymentView::new(payment, booking, number))
            })
            .collect())
    }

    /// Authorize a settlement and fail fast on a payment that is already final.
    /// The transition re-checks the status under lock.
    async fn load_pending(&self, actor: &Actor, payment_id: Uuid) -> CoreResult<Payment> {
        AccessScope::require_settle_payment(actor)?;

        let payment = self.load(payment_id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(CoreError::NotPending {
                payment_id,
                status: payment.status,
            });
        }
        Ok(payment)
    }

    async fn load(&self, payment_id: Uuid) -> CoreResult<Payment> {
        self.bookings
            .repository()
            .get_payment(payment_id)
            .await?
            .ok_or(CoreError::PaymentNotFound(payment_id))
    }

    async fn booking_of(&self, payment: &Payment) -> CoreResult<Booking> {
        self.bookings
            .repository()
            .get_booking(payment.booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(payment.booking_id))
    }

    async fn view(&self, payment: Payment, booking: &Booking) -> CoreResult<PaymentView> {
        let flight = self.bookings.load_flight(booking.flight_id).await?;
        Ok(PaymentView::new(payment, booking, flight.flight_number))
    }

    async fn publish(&self, topic: &str, payment: &Payment, actor: &Actor) {
        let event = PaymentSettledEvent {
            payment_id: payment.id,
            booking_id: payment.booking_id,
            status: payment.status.to_string(),
            amount: payment.amount,
            settled_by: actor.id,
            timestamp: Utc::now().timestamp(),
        };
        publish_json(self.events.as_ref(), topic, &payment.booking_id.to_string(), &event).await;
    }
}
