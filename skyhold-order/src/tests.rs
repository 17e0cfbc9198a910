use crate::*;
use chrono::{Duration, Utc};
use skyhold_catalog::FlightInventory;
use skyhold_core::repository::{BookingQuery, BookingRepository, FlightRepository};
use skyhold_core::{Actor, BookingStatus, CoreError, Flight, Money, PaymentStatus, SeatClass, SeatClassOffer};
use skyhold_store::memory::{InMemoryBookingRepository, InMemoryEventLog, InMemoryFlightRepository};
use std::sync::Arc;
use uuid::Uuid;

struct Harness {
    flights: Arc<InMemoryFlightRepository>,
    bookings: Arc<InMemoryBookingRepository>,
    events: Arc<InMemoryEventLog>,
    lifecycle: Arc<BookingLifecycle>,
    payments: Arc<PaymentLifecycle>,
    airline_id: Uuid,
}

impl Harness {
    fn new() -> Self {
        let flights = Arc::new(InMemoryFlightRepository::new());
        let bookings = Arc::new(InMemoryBookingRepository::new(flights.clone()));
        let events = Arc::new(InMemoryEventLog::new());
        let inventory = Arc::new(FlightInventory::new(flights.clone()));
        let lifecycle = Arc::new(BookingLifecycle::new(
            bookings.clone(),
            flights.clone(),
            inventory,
            events.clone(),
            BookingRules::default(),
        ));
        let payments = Arc::new(PaymentLifecycle::new(lifecycle.clone(), events.clone()));

        Self {
            flights,
            bookings,
            events,
            lifecycle,
            payments,
            airline_id: Uuid::new_v4(),
        }
    }

    async fn flight(&self, number: &str, capacity: u32) -> Flight {
        let now = Utc::now();
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: number.to_string(),
            airline_id: self.airline_id,
            origin: "SIN".to_string(),
            destination: "NRT".to_string(),
            departure_time: now + Duration::days(5),
            arrival_time: now + Duration::days(5) + Duration::hours(7),
            capacity,
            remaining_seats: capacity,
            offers: vec![
                SeatClassOffer::new(SeatClass::Economy, Money::from_minor(100)),
                SeatClassOffer {
                    class: SeatClass::FirstClass,
                    price: Money::from_minor(900),
                    active: false,
                },
            ],
            created_at: now,
            updated_at: now,
        };
        self.flights.insert_flight(&flight).await.unwrap();
        flight
    }

    async fn remaining(&self, flight: &Flight) -> u32 {
        self.flights.get_flight(flight.id).await.unwrap().unwrap().remaining_seats
    }

    async fn book(&self, traveler: &Actor, flight: &Flight, count: u32) -> Result<BookingView, CoreError> {
        self.lifecycle.create(traveler, request(flight, count)).await
    }

    /// capacity - remaining must equal the seats held by Pending/Confirmed bookings
    async fn assert_conserved(&self, flight: &Flight) {
        let stored = self.flights.get_flight(flight.id).await.unwrap().unwrap();
        let held: u32 = self
            .bookings
            .list_bookings(&BookingQuery {
                flight_ids: Some(vec![flight.id]),
                ..Default::default()
            })
            .await
            .unwrap()
            .iter()
            .filter(|b| b.status.is_seat_holding())
            .map(|b| b.seat_count)
            .sum();
        assert_eq!(stored.capacity - stored.remaining_seats, held);
    }
}

fn request(flight: &Flight, count: u32) -> BookingRequest {
    BookingRequest {
        flight_id: flight.id,
        seat_class: SeatClass::Economy,
        seat_count: count,
        payment_method: "card".to_string(),
    }
}

fn payment_id(view: &BookingView) -> Uuid {
    view.payment.as_ref().unwrap().id
}

#[tokio::test]
async fn test_scenario_a_booking_takes_seats() {
    let h = Harness::new();
    let flight = h.flight("SK1", 2).await;
    let traveler = Actor::traveler(Uuid::new_v4());

    let view = h.book(&traveler, &flight, 2).await.unwrap();
    assert_eq!(view.booking.status, BookingStatus::Pending);
    assert_eq!(view.booking.total_price, Money::from_minor(200));
    let payment = view.payment.as_ref().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Money::from_minor(200));
    assert_eq!(h.remaining(&flight).await, 0);

    let err = h.book(&traveler, &flight, 1).await.unwrap_err();
    assert!(matches!(err, CoreError::InsufficientSeats { requested: 1, available: 0 }));
    assert_eq!(h.events.topics(), vec!["booking.created".to_string()]);
}

#[tokio::test]
async fn test_scenario_b_confirm_keeps_seats() {
    let h = Harness::new();
    let flight = h.flight("SK2", 2).await;
    let admin = Actor::admin(Uuid::new_v4());
    let view = h.book(&Actor::traveler(Uuid::new_v4()), &flight, 2).await.unwrap();

    let confirmed = h.payments.confirm(&admin, payment_id(&view)).await.unwrap();
    assert_eq!(confirmed.payment.status, PaymentStatus::Confirmed);
    assert_eq!(confirmed.booking_status, BookingStatus::Confirmed);
    assert_eq!(h.remaining(&flight).await, 0);

    let topics = h.events.topics();
    assert!(topics.contains(&"booking.confirmed".to_string()));
    assert!(topics.contains(&"payment.confirmed".to_string()));
}

#[tokio::test]
async fn test_scenario_c_confirmed_payment_cannot_be_cancelled() {
    let h = Harness::new();
    let flight = h.flight("SK3", 2).await;
    let admin = Actor::admin(Uuid::new_v4());
    let view = h.book(&Actor::traveler(Uuid::new_v4()), &flight, 2).await.unwrap();
    h.payments.confirm(&admin, payment_id(&view)).await.unwrap();

    let err = h.payments.cancel(&admin, payment_id(&view)).await.unwrap_err();
    assert!(matches!(err, CoreError::NotPending { status: PaymentStatus::Confirmed, .. }));

    let booking = h.bookings.get_booking(view.booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(h.remaining(&flight).await, 0);
}

#[tokio::test]
async fn test_scenario_d_cancel_returns_seats() {
    let h = Harness::new();
    let flight = h.flight("SK4", 5).await;
    let traveler = Actor::traveler(Uuid::new_v4());
    let view = h.book(&traveler, &flight, 3).await.unwrap();
    assert_eq!(h.remaining(&flight).await, 2);

    let cancelled = h.lifecycle.cancel(&traveler, view.booking.id).await.unwrap();
    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.payment.unwrap().status, PaymentStatus::Cancelled);
    assert_eq!(h.remaining(&flight).await, 5);
}

#[tokio::test]
async fn test_cancel_twice_releases_once() {
    let h = Harness::new();
    let flight = h.flight("SK5", 5).await;
    let traveler = Actor::traveler(Uuid::new_v4());
    let keep = h.book(&traveler, &flight, 1).await.unwrap();
    let view = h.book(&traveler, &flight, 3).await.unwrap();

    h.lifecycle.cancel(&traveler, view.booking.id).await.unwrap();
    let err = h.lifecycle.cancel(&traveler, view.booking.id).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyCancelled(id) if id == view.booking.id));

    assert_eq!(h.remaining(&flight).await, 4);
    assert_eq!(keep.booking.status, BookingStatus::Pending);
    h.assert_conserved(&flight).await;
}

#[tokio::test]
async fn test_cancel_confirmed_booking_keeps_settled_payment() {
    let h = Harness::new();
    let flight = h.flight("SK6", 4).await;
    let admin = Actor::admin(Uuid::new_v4());
    let view = h.book(&Actor::traveler(Uuid::new_v4()), &flight, 2).await.unwrap();
    h.payments.confirm(&admin, payment_id(&view)).await.unwrap();

    let cancelled = h.lifecycle.cancel(&admin, view.booking.id).await.unwrap();
    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.payment.unwrap().status, PaymentStatus::Confirmed);
    assert_eq!(h.remaining(&flight).await, 4);
}

#[tokio::test]
async fn test_payment_cancellation_releases_seats() {
    let h = Harness::new();
    let flight = h.flight("SK7", 4).await;
    let admin = Actor::admin(Uuid::new_v4());
    let view = h.book(&Actor::traveler(Uuid::new_v4()), &flight, 3).await.unwrap();

    let cancelled = h.payments.cancel(&admin, payment_id(&view)).await.unwrap();
    assert_eq!(cancelled.payment.status, PaymentStatus::Cancelled);
    assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
    assert_eq!(h.remaining(&flight).await, 4);

    let err = h.payments.confirm(&admin, payment_id(&view)).await.unwrap_err();
    assert!(matches!(err, CoreError::NotPending { status: PaymentStatus::Cancelled, .. }));
}

#[tokio::test]
async fn test_invalid_requests_take_no_seats() {
    let h = Harness::new();
    let flight = h.flight("SK8", 20).await;
    let traveler = Actor::traveler(Uuid::new_v4());

    let err = h.book(&traveler, &flight, 0).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidCount { requested: 0, max: 10 }));
    let err = h.book(&traveler, &flight, 11).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidCount { requested: 11, max: 10 }));

    let mut first_class = request(&flight, 1);
    first_class.seat_class = SeatClass::FirstClass;
    let err = h.lifecycle.create(&traveler, first_class).await.unwrap_err();
    assert!(matches!(err, CoreError::InactiveSeatClass(SeatClass::FirstClass)));

    let mut business = request(&flight, 1);
    business.seat_class = SeatClass::Business;
    let err = h.lifecycle.create(&traveler, business).await.unwrap_err();
    assert!(matches!(err, CoreError::UnknownSeatClass(SeatClass::Business)));

    let mut missing = request(&flight, 1);
    missing.flight_id = Uuid::new_v4();
    let err = h.lifecycle.create(&traveler, missing).await.unwrap_err();
    assert!(matches!(err, CoreError::FlightNotFound(_)));

    assert_eq!(h.remaining(&flight).await, 20);
    assert!(h.events.topics().is_empty());
}

#[tokio::test]
async fn test_only_authorized_actors_mutate() {
    let h = Harness::new();
    let flight = h.flight("SK9", 5).await;
    let owner = Actor::traveler(Uuid::new_v4());
    let stranger = Actor::traveler(Uuid::new_v4());
    let airline = Actor::airline(Uuid::new_v4(), h.airline_id);

    let err = h.book(&airline, &flight, 1).await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));

    let view = h.book(&owner, &flight, 2).await.unwrap();
    let err = h.lifecycle.cancel(&stranger, view.booking.id).await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
    let err = h.payments.confirm(&airline, payment_id(&view)).await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
    let err = h.payments.cancel(&owner, payment_id(&view)).await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));

    assert_eq!(h.remaining(&flight).await, 3);
}

#[tokio::test]
async fn test_failed_persist_rolls_back_reservation() {
    let h = Harness::new();
    let flight = h.flight("SK10", 3).await;
    h.bookings.fail_inserts(true);

    let err = h.book(&Actor::traveler(Uuid::new_v4()), &flight, 2).await.unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert!(err.is_fatal());
    assert_eq!(h.remaining(&flight).await, 3);
    assert!(h.events.topics().is_empty());
}

#[tokio::test]
async fn test_failed_release_keeps_booking_holding_seats() {
    let h = Harness::new();
    let flight = h.flight("SK16", 5).await;
    let traveler = Actor::traveler(Uuid::new_v4());
    let view = h.book(&traveler, &flight, 3).await.unwrap();
    h.flights.fail_releases(flight.id, true);

    let err = h.lifecycle.cancel(&traveler, view.booking.id).await.unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert!(err.is_fatal());

    let booking = h.bookings.get_booking(view.booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    let payment = h.bookings.get_payment(payment_id(&view)).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(h.remaining(&flight).await, 2);
    h.assert_conserved(&flight).await;
    assert!(!h.events.topics().contains(&"booking.cancelled".to_string()));

    // Retrying once storage recovers releases the seats exactly once
    h.flights.fail_releases(flight.id, false);
    let cancelled = h.lifecycle.cancel(&traveler, view.booking.id).await.unwrap();
    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    assert_eq!(h.remaining(&flight).await, 5);
    h.assert_conserved(&flight).await;
}

#[tokio::test]
async fn test_failed_release_keeps_payment_pending() {
    let h = Harness::new();
    let flight = h.flight("SK17", 4).await;
    let admin = Actor::admin(Uuid::new_v4());
    let view = h.book(&Actor::traveler(Uuid::new_v4()), &flight, 2).await.unwrap();
    h.flights.fail_releases(flight.id, true);

    let err = h.payments.cancel(&admin, payment_id(&view)).await.unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    let payment = h.bookings.get_payment(payment_id(&view)).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(h.remaining(&flight).await, 2);
    h.assert_conserved(&flight).await;

    h.flights.fail_releases(flight.id, false);
    let cancelled = h.payments.cancel(&admin, payment_id(&view)).await.unwrap();
    assert_eq!(cancelled.payment.status, PaymentStatus::Cancelled);
    assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
    assert_eq!(h.remaining(&flight).await, 4);
    h.assert_conserved(&flight).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_is_sold_once() {
    let h = Harness::new();
    let flight = h.flight("SK11", 1).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let lifecycle = h.lifecycle.clone();
        let req = request(&flight, 1);
        let traveler = Actor::traveler(Uuid::new_v4());
        handles.push(tokio::spawn(async move { lifecycle.create(&traveler, req).await }));
    }

    let mut granted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(CoreError::InsufficientSeats { .. }) => refused += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!((granted, refused), (1, 1));
    assert_eq!(h.remaining(&flight).await, 0);
    h.assert_conserved(&flight).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_and_confirm_race_has_one_winner() {
    let h = Harness::new();
    let flight = h.flight("SK12", 10).await;
    let admin = Actor::admin(Uuid::new_v4());

    for _ in 0..20 {
        let traveler = Actor::traveler(Uuid::new_v4());
        let view = h.book(&traveler, &flight, 1).await.unwrap();

        let lifecycle = h.lifecycle.clone();
        let booking_id = view.booking.id;
        let cancel = tokio::spawn(async move { lifecycle.cancel(&traveler, booking_id).await.map(|_| ()) });
        let payments = h.payments.clone();
        let admin = admin.clone();
        let pid = payment_id(&view);
        let confirm = tokio::spawn(async move { payments.confirm(&admin, pid).await.map(|_| ()) });

        let cancel = cancel.await.unwrap();
        let confirm = confirm.await.unwrap();

        match (&cancel, &confirm) {
            // Cancel first: confirm sees the cancelled payment
            (Ok(()), Err(CoreError::NotPending { .. })) => {}
            // Confirm first: the confirmed booking is still cancellable
            (Ok(()), Ok(())) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }

        let booking = h.bookings.get_booking(booking_id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    assert_eq!(h.remaining(&flight).await, 10);
    h.assert_conserved(&flight).await;
}

#[tokio::test]
async fn test_expiry_releases_stale_pending_bookings() {
    let h = Harness::new();
    let flight = h.flight("SK13", 6).await;
    let admin = Actor::admin(Uuid::new_v4());
    let traveler = Actor::traveler(Uuid::new_v4());

    let stale = h.book(&traveler, &flight, 2).await.unwrap();
    let paid = h.book(&traveler, &flight, 1).await.unwrap();
    h.payments.confirm(&admin, payment_id(&paid)).await.unwrap();

    let sweeper = ExpirySweeper::new(h.lifecycle.clone(), std::time::Duration::from_secs(900));
    assert_eq!(sweeper.sweep(Utc::now()).await.unwrap(), 0);

    let later = Utc::now() + Duration::minutes(30);
    assert_eq!(sweeper.sweep(later).await.unwrap(), 1);
    assert_eq!(sweeper.sweep(later).await.unwrap(), 0);

    let booking = h.bookings.get_booking(stale.booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    let payment = h.bookings.get_payment(payment_id(&stale)).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Cancelled);

    assert_eq!(h.remaining(&flight).await, 5);
    assert!(h.events.topics().contains(&"booking.expired".to_string()));
    h.assert_conserved(&flight).await;
}

#[tokio::test]
async fn test_sweep_continues_past_failing_booking() {
    let h = Harness::new();
    let stuck_flight = h.flight("SK18", 4).await;
    let other_flight = h.flight("SK19", 4).await;
    let traveler = Actor::traveler(Uuid::new_v4());

    // Oldest first, so the failing booking is swept before the other one
    let stuck = h.book(&traveler, &stuck_flight, 2).await.unwrap();
    let other = h.book(&traveler, &other_flight, 3).await.unwrap();
    h.flights.fail_releases(stuck_flight.id, true);

    let sweeper = ExpirySweeper::new(h.lifecycle.clone(), std::time::Duration::from_secs(900));
    let later = Utc::now() + Duration::minutes(30);
    assert_eq!(sweeper.sweep(later).await.unwrap(), 1);

    let booking = h.bookings.get_booking(stuck.booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    let booking = h.bookings.get_booking(other.booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(h.remaining(&stuck_flight).await, 2);
    assert_eq!(h.remaining(&other_flight).await, 4);
    h.assert_conserved(&stuck_flight).await;
    h.assert_conserved(&other_flight).await;

    // Picked up by the next sweep
    h.flights.fail_releases(stuck_flight.id, false);
    assert_eq!(sweeper.sweep(later).await.unwrap(), 1);
    assert_eq!(h.remaining(&stuck_flight).await, 4);
    h.assert_conserved(&stuck_flight).await;
}

#[tokio::test]
async fn test_listings_are_scoped() {
    let h = Harness::new();
    let ours = h.flight("SK14", 10).await;
    let foreign_airline = Uuid::new_v4();
    let theirs = Flight {
        id: Uuid::new_v4(),
        flight_number: "ZZ1".to_string(),
        airline_id: foreign_airline,
        ..ours.clone()
    };
    h.flights.insert_flight(&theirs).await.unwrap();

    let alice = Actor::traveler(Uuid::new_v4());
    let bob = Actor::traveler(Uuid::new_v4());
    let a1 = h.book(&alice, &ours, 1).await.unwrap();
    h.book(&alice, &theirs, 1).await.unwrap();
    h.book(&bob, &ours, 2).await.unwrap();

    let airline = Actor::airline(Uuid::new_v4(), h.airline_id);
    let all = BookingFilter::default();
    assert_eq!(h.lifecycle.list(&airline, &all).await.unwrap().len(), 2);
    assert_eq!(h.lifecycle.list(&alice, &all).await.unwrap().len(), 2);
    assert_eq!(h.lifecycle.list(&Actor::admin(Uuid::new_v4()), &all).await.unwrap().len(), 3);

    let by_number = BookingFilter {
        flight_number: Some("ZZ1".to_string()),
        ..Default::default()
    };
    assert!(h.lifecycle.list(&airline, &by_number).await.unwrap().is_empty());
    let mine = h.lifecycle.list(&alice, &by_number).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].flight_number, "ZZ1");
    assert!(mine[0].payment.is_some());

    let by_id = BookingFilter {
        booking_id: Some(a1.booking.id),
        ..Default::default()
    };
    assert_eq!(h.lifecycle.list(&bob, &by_id).await.unwrap().len(), 0);

    let err = h.lifecycle.get(&bob, a1.booking.id).await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
    let err = h
        .payments
        .get(&Actor::airline(Uuid::new_v4(), foreign_airline), payment_id(&a1))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
}

#[tokio::test]
async fn test_payment_listing_by_status() {
    let h = Harness::new();
    let flight = h.flight("SK15", 10).await;
    let admin = Actor::admin(Uuid::new_v4());
    let traveler = Actor::traveler(Uuid::new_v4());

    let first = h.book(&traveler, &flight, 1).await.unwrap();
    h.book(&traveler, &flight, 1).await.unwrap();
    h.payments.confirm(&admin, payment_id(&first)).await.unwrap();

    let confirmed = PaymentFilter {
        status: Some(PaymentStatus::Confirmed),
        ..Default::default()
    };
    let views = h.payments.list(&admin, &confirmed).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].payment.booking_id, first.booking.id);
    assert_eq!(views[0].flight_number, "SK15");

    assert_eq!(h.payments.list(&traveler, &PaymentFilter::default()).await.unwrap().len(), 2);
    let stranger = Actor::traveler(Uuid::new_v4());
    assert!(h.payments.list(&stranger, &PaymentFilter::default()).await.unwrap().is_empty());
}

mod conservation {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Create { traveler: usize, count: u32 },
        Cancel(usize),
        Confirm(usize),
        CancelPayment(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize, 1..5u32).prop_map(|(traveler, count)| Op::Create { traveler, count }),
            any::<usize>().prop_map(Op::Cancel),
            any::<usize>().prop_map(Op::Confirm),
            any::<usize>().prop_map(Op::CancelPayment),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_seats_are_conserved(ops in proptest::collection::vec(op(), 1..40)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (capacity, remaining, held) = rt.block_on(async {
                let h = Harness::new();
                let flight = h.flight("PROP1", 12).await;
                let admin = Actor::admin(Uuid::new_v4());
                let travelers: Vec<Actor> = (0..3).map(|_| Actor::traveler(Uuid::new_v4())).collect();
                let mut created: Vec<BookingView> = Vec::new();

                for op in ops {
                    match op {
                        Op::Create { traveler, count } => {
                            if let Ok(view) = h.book(&travelers[traveler], &flight, count).await {
                                created.push(view);
                            }
                        }
                        Op::Cancel(i) if !created.is_empty() => {
                            let view = &created[i % created.len()];
                            let _ = h.lifecycle.cancel(&admin, view.booking.id).await;
                        }
                        Op::Confirm(i) if !created.is_empty() => {
                            let view = &created[i % created.len()];
                            let _ = h.payments.confirm(&admin, payment_id(view)).await;
                        }
                        Op::CancelPayment(i) if !created.is_empty() => {
                            let view = &created[i % created.len()];
                            let _ = h.payments.cancel(&admin, payment_id(view)).await;
                        }
                        _ => {}
                    }
                }

                let stored = h.flights.get_flight(flight.id).await.unwrap().unwrap();
                let held: u32 = h
                    .bookings
                    .list_bookings(&BookingQuery::default())
                    .await
                    .unwrap()
                    .iter()
                    .filter(|b| b.status.is_seat_holding())
                    .map(|b| b.seat_count)
                    .sum();
                (stored.capacity, stored.remaining_seats, held)
            });

            prop_assert!(remaining <= capacity);
            prop_assert_eq!(capacity - remaining, held);
        }
    }
}
