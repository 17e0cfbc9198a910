use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyhold_core::repository::{DeleteOutcome, FlightRepository, SeatCounts, SeatUpdate, StoreResult};
use skyhold_core::{Flight, SeatClass, SeatClassOffer};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed flights. Every seat primitive is one conditional UPDATE,
/// so the row lock taken by Postgres serializes concurrent changes per flight.
pub struct PgFlightRepository {
    pool: PgPool,
}

impl PgFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn counts(&self, id: Uuid) -> StoreResult<Option<SeatCounts>> {
        let row: Option<(i32, i32)> =
            sqlx::query_as("SELECT capacity, remaining_seats FROM flights WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(to_counts).transpose()
    }

    /// Map the RETURNING row of a conditional update, falling back to a
    /// plain read to tell a failed guard from a missing flight
    async fn seat_update(&self, id: Uuid, returned: Option<(i32, i32)>) -> StoreResult<SeatUpdate> {
        if let Some(row) = returned {
            return Ok(SeatUpdate::Applied(to_counts(row)?));
        }

        Ok(match self.counts(id).await? {
            Some(counts) => SeatUpdate::Rejected(counts),
            None => SeatUpdate::Missing,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    airline_id: Uuid,
    origin: String,
    destination: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    capacity: i32,
    remaining_seats: i32,
    offers: Json<Vec<SeatClassOffer>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlightRow> for Flight {
    type Error = skyhold_core::repository::StoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            airline_id: row.airline_id,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            capacity: u32::try_from(row.capacity)?,
            remaining_seats: u32::try_from(row.remaining_seats)?,
            offers: row.offers.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const FLIGHT_COLUMNS: &str = "id, flight_number, airline_id, origin, destination, departure_time, \
     arrival_time, capacity, remaining_seats, offers, created_at, updated_at";

fn to_counts((capacity, remaining): (i32, i32)) -> StoreResult<SeatCounts> {
    Ok(SeatCounts {
        capacity: u32::try_from(capacity)?,
        remaining: u32::try_from(remaining)?,
    })
}

fn to_db(value: u32) -> StoreResult<i32> {
    Ok(i32::try_from(value)?)
}

#[async_trait]
impl FlightRepository for PgFlightRepository {
    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, airline_id, origin, destination, departure_time,
                                 arrival_time, capacity, remaining_seats, offers, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(flight.airline_id)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(to_db(flight.capacity)?)
        .bind(to_db(flight.remaining_seats)?)
        .bind(Json(&flight.offers))
        .bind(flight.created_at)
        .bind(flight.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        let row: Option<FlightRow> =
            sqlx::query_as(&format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Flight::try_from).transpose()
    }

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<Flight>> {
        let row: Option<FlightRow> =
            sqlx::query_as(&format!("SELECT {} FROM flights WHERE flight_number = $1", FLIGHT_COLUMNS))
                .bind(flight_number)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Flight::try_from).transpose()
    }

    async fn list_flights(&self, airline_id: Option<Uuid>) -> StoreResult<Vec<Flight>> {
        let rows: Vec<FlightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flights WHERE ($1::uuid IS NULL OR airline_id = $1) \
             ORDER BY departure_time, flight_number",
            FLIGHT_COLUMNS
        ))
        .bind(airline_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Flight::try_from).collect()
    }

    async fn update_details(&self, flight: &Flight) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE flights
            SET flight_number = $2, origin = $3, destination = $4, departure_time = $5,
                arrival_time = $6, offers = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(Json(&flight.offers))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reserve_seats(&self, id: Uuid, seat_class: SeatClass, count: u32) -> StoreResult<SeatUpdate> {
        let returned: Option<(i32, i32)> = sqlx::query_as(
            r#"
            UPDATE flights
            SET remaining_seats = remaining_seats - $2, updated_at = NOW()
            WHERE id = $1 AND remaining_seats >= $2
              AND offers @> jsonb_build_array(jsonb_build_object('class', $3::text, 'active', true))
            RETURNING capacity, remaining_seats
            "#,
        )
        .bind(id)
        .bind(to_db(count)?)
        .bind(seat_class.as_str())
        .fetch_optional(&self.pool)
        .await?;

        self.seat_update(id, returned).await
    }

    async fn release_seats(&self, id: Uuid, count: u32) -> StoreResult<SeatUpdate> {
        let returned: Option<(i32, i32)> = sqlx::query_as(
            r#"
            UPDATE flights
            SET remaining_seats = remaining_seats + $2, updated_at = NOW()
            WHERE id = $1 AND remaining_seats + $2 <= capacity
            RETURNING capacity, remaining_seats
            "#,
        )
        .bind(id)
        .bind(to_db(count)?)
        .fetch_optional(&self.pool)
        .await?;

        self.seat_update(id, returned).await
    }

    async fn resize_capacity(&self, id: Uuid, new_capacity: u32) -> StoreResult<SeatUpdate> {
        let returned: Option<(i32, i32)> = sqlx::query_as(
            r#"
            UPDATE flights
            SET remaining_seats = remaining_seats + ($2 - capacity), capacity = $2, updated_at = NOW()
            WHERE id = $1 AND capacity - remaining_seats <= $2
            RETURNING capacity, remaining_seats
            "#,
        )
        .bind(id)
        .bind(to_db(new_capacity)?)
        .fetch_optional(&self.pool)
        .await?;

        self.seat_update(id, returned).await
    }

    async fn delete_if_unsold(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        let result = sqlx::query("DELETE FROM flights WHERE id = $1 AND remaining_seats = capacity")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            return Ok(DeleteOutcome::Deleted);
        }

        Ok(match self.counts(id).await? {
            Some(_) => DeleteOutcome::HasSoldSeats,
            None => DeleteOutcome::Missing,
        })
    }
}
