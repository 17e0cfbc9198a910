use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyhold_core::repository::{
    BookingQuery, BookingRepository, SeatCounts, StatusChange, StoreError, StoreResult, TransitionOutcome,
};
use skyhold_core::{Booking, BookingStatus, Money, Payment, PaymentStatus, SeatClass};
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed bookings and payments. Shares the flights table with
/// `PgFlightRepository` so a transition can return seats in its own transaction.
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    flight_id: Uuid,
    traveler_id: Uuid,
    seat_class: String,
    seat_count: i32,
    total_price: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    method: String,
    amount: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            flight_id: row.flight_id,
            traveler_id: row.traveler_id,
            seat_class: SeatClass::parse(&row.seat_class)
                .ok_or_else(|| format!("unknown seat class in booking {}: {}", row.id, row.seat_class))?,
            seat_count: u32::try_from(row.seat_count)?,
            total_price: Money::from_minor(row.total_price),
            status: BookingStatus::parse(&row.status)
                .ok_or_else(|| format!("unknown status in booking {}: {}", row.id, row.status))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            method: row.method,
            amount: Money::from_minor(row.amount),
            status: PaymentStatus::parse(&row.status)
                .ok_or_else(|| format!("unknown status in payment {}: {}", row.id, row.status))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str =
    "b.id, b.flight_id, b.traveler_id, b.seat_class, b.seat_count, b.total_price, b.status, b.created_at, b.updated_at";
const PAYMENT_COLUMNS: &str = "p.id, p.booking_id, p.method, p.amount, p.status, p.created_at, p.updated_at";

/// Shared WHERE clause for `BookingQuery`; payment status is `$5`
const QUERY_FILTER: &str = "($1::uuid IS NULL OR b.id = $1) \
     AND ($2::uuid IS NULL OR b.traveler_id = $2) \
     AND ($3::uuid[] IS NULL OR b.flight_id = ANY($3)) \
     AND ($4::text IS NULL OR b.status = $4)";

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert_booking(&self, booking: &Booking, payment: &Payment) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, flight_id, traveler_id, seat_class, seat_count, total_price, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(booking.flight_id)
        .bind(booking.traveler_id)
        .bind(booking.seat_class.as_str())
        .bind(i32::try_from(booking.seat_count)?)
        .bind(booking.total_price.minor_units())
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, method, amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(&payment.method)
        .bind(payment.amount.minor_units())
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings b WHERE b.id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("SELECT {} FROM payments p WHERE p.id = $1", PAYMENT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn payment_for_booking(&self, booking_id: Uuid) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("SELECT {} FROM payments p WHERE p.booking_id = $1", PAYMENT_COLUMNS))
                .bind(booking_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn list_bookings(&self, query: &BookingQuery) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings b WHERE {} ORDER BY b.created_at DESC",
            BOOKING_COLUMNS, QUERY_FILTER
        ))
        .bind(query.booking_id)
        .bind(query.traveler_id)
        .bind(query.flight_ids.clone())
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn list_payments(&self, query: &BookingQuery) -> StoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments p JOIN bookings b ON b.id = p.booking_id \
             WHERE {} AND ($5::text IS NULL OR p.status = $5) ORDER BY p.created_at DESC",
            PAYMENT_COLUMNS, QUERY_FILTER
        ))
        .bind(query.booking_id)
        .bind(query.traveler_id)
        .bind(query.flight_ids.clone())
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.payment_status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn transition(&self, booking_id: Uuid, change: &StatusChange) -> StoreResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        // 1. Lock the booking row, then its payment, in that order on every path
        let booking_row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings b WHERE b.id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(booking_row) = booking_row else {
            return Ok(TransitionOutcome::Missing);
        };

        let payment_row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments p WHERE p.booking_id = $1 FOR UPDATE",
            PAYMENT_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(payment_row) = payment_row else {
            return Ok(TransitionOutcome::Missing);
        };

        let mut booking = Booking::try_from(booking_row)?;
        let mut payment = Payment::try_from(payment_row)?;

        // 2. Check
        if !change.permits(booking.status, payment.status) {
            return Ok(TransitionOutcome::Rejected {
                booking: booking.status,
                payment: payment.status,
            });
        }

        // 3. Return the seats; a refused release rolls the whole transaction back
        if change.releases_seats {
            let seats = i32::try_from(booking.seat_count)?;
            let returned: Option<(i32, i32)> = sqlx::query_as(
                r#"
                UPDATE flights
                SET remaining_seats = remaining_seats + $2, updated_at = NOW()
                WHERE id = $1 AND remaining_seats + $2 <= capacity
                RETURNING capacity, remaining_seats
                "#,
            )
            .bind(booking.flight_id)
            .bind(seats)
            .fetch_optional(&mut *tx)
            .await?;

            if returned.is_none() {
                let current: Option<(i32, i32)> =
                    sqlx::query_as("SELECT capacity, remaining_seats FROM flights WHERE id = $1")
                        .bind(booking.flight_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                let seats = current
                    .map(|(capacity, remaining)| -> StoreResult<SeatCounts> {
                        Ok(SeatCounts {
                            capacity: u32::try_from(capacity)?,
                            remaining: u32::try_from(remaining)?,
                        })
                    })
                    .transpose()?;
                tx.rollback().await?;
                return Ok(TransitionOutcome::ReleaseRefused { booking, seats });
            }
        }

        // 4. Set
        let now = Utc::now();
        booking.status = change.booking_to;
        booking.updated_at = now;
        sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(booking.id)
            .bind(booking.status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        if payment.status == PaymentStatus::Pending {
            payment.status = change.payment_to;
            payment.updated_at = now;
            sqlx::query("UPDATE payments SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(payment.id)
                .bind(payment.status.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(TransitionOutcome::Applied { booking, payment })
    }

    async fn pending_created_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings b WHERE b.status = 'Pending' AND b.created_at < $1 ORDER BY b.created_at",
            BOOKING_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}
